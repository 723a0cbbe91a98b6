//! Circuit-breaker wrapper for the inference client.
//!
//! This is the injected retry collaborator: a closed/open/half-open state
//! machine around any [`InferenceClient`], with bounded backoff for
//! rate-limit responses. The invoker's call logic stays free of retry
//! policy; it simply receives a client that happens to be wrapped.
//!
//! States:
//! - **Closed**: normal operation, every call passes through.
//! - **Open**: too many transport failures; calls fail fast until the reset
//!   timeout elapses.
//! - **Half-open**: probing; enough consecutive successes close the circuit.

use std::time::Duration;

use clinex_core::error::{AgentCallResult, AgentError};
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{InferenceClient, InferenceRequest};

/// Circuit-breaker thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Transport failures before the circuit opens
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before probing
    pub reset_timeout: Duration,
    /// Consecutive half-open successes needed to close
    pub success_threshold: u32,
    /// Bounded retries for rate-limited calls
    pub rate_limit_retries: u32,
    /// Base delay for rate-limit backoff, doubled per attempt
    pub backoff_base: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            success_threshold: 2,
            rate_limit_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Circuit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// An [`InferenceClient`] wrapper applying circuit-breaking and rate-limit
/// backoff around the wrapped client.
pub struct CircuitBreakerClient<C> {
    inner: C,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl<C> CircuitBreakerClient<C> {
    #[must_use]
    pub fn new(inner: C, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    /// Current circuit position, for diagnostics.
    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    /// Admit a call, transitioning open → half-open once the reset timeout
    /// has elapsed.
    async fn admit(&self) -> AgentCallResult<()> {
        let mut guard = self.state.lock().await;
        if guard.state == CircuitState::Open {
            let elapsed_reset = guard
                .last_failure
                .is_none_or(|at| at.elapsed() >= self.config.reset_timeout);
            if elapsed_reset {
                debug!("circuit half-open, probing inference service");
                guard.state = CircuitState::HalfOpen;
                guard.successes = 0;
            } else {
                return Err(AgentError::Transport(
                    "circuit open: inference service unavailable".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn record_success(&self) {
        let mut guard = self.state.lock().await;
        guard.failures = 0;
        if guard.state == CircuitState::HalfOpen {
            guard.successes += 1;
            if guard.successes >= self.config.success_threshold {
                debug!("circuit closed after successful probes");
                guard.state = CircuitState::Closed;
                guard.successes = 0;
            }
        }
    }

    async fn record_failure(&self) {
        let mut guard = self.state.lock().await;
        guard.failures += 1;
        guard.successes = 0;
        guard.last_failure = Some(Instant::now());
        if guard.failures >= self.config.failure_threshold {
            warn!(
                failures = guard.failures,
                "circuit opened: inference service failing"
            );
            guard.state = CircuitState::Open;
        }
    }
}

impl<C: InferenceClient> InferenceClient for CircuitBreakerClient<C> {
    fn generate(&self, request: InferenceRequest) -> BoxFuture<'_, AgentCallResult<String>> {
        Box::pin(async move {
            self.admit().await?;

            let mut attempt = 0u32;
            loop {
                match self.inner.generate(request.clone()).await {
                    Ok(text) => {
                        self.record_success().await;
                        return Ok(text);
                    }
                    Err(AgentError::RateLimited) if attempt < self.config.rate_limit_retries => {
                        let delay = self.config.backoff_base * 2u32.pow(attempt);
                        attempt += 1;
                        debug!(attempt, ?delay, "rate limited, backing off");
                        tokio::time::sleep(delay).await;
                    }
                    Err(AgentError::RateLimited) => {
                        self.record_failure().await;
                        return Err(AgentError::Transport(
                            "rate limit retries exhausted".to_string(),
                        ));
                    }
                    Err(err @ AgentError::Transport(_)) => {
                        self.record_failure().await;
                        return Err(err);
                    }
                    // Content-level failures say nothing about service
                    // availability and must not trip the breaker.
                    Err(err) => return Err(err),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    enum Script {
        Ok,
        Transport,
        RateLimited,
        Malformed,
    }

    struct ScriptedClient {
        script: Script,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedClient {
        fn new(script: Script) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    script,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl InferenceClient for ScriptedClient {
        fn generate(&self, _request: InferenceRequest) -> BoxFuture<'_, AgentCallResult<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match self.script {
                    Script::Ok => Ok("{}".to_string()),
                    Script::Transport => Err(AgentError::Transport("refused".to_string())),
                    Script::RateLimited => Err(AgentError::RateLimited),
                    Script::Malformed => {
                        Err(AgentError::MalformedResponse("not json".to_string()))
                    }
                }
            })
        }
    }

    fn request() -> InferenceRequest {
        InferenceRequest {
            agent_name: "general_reviewer".to_string(),
            prompt: "review".to_string(),
            response_schema: serde_json::json!({}),
        }
    }

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            reset_timeout: Duration::from_secs(60),
            backoff_base: Duration::from_millis(10),
            ..CircuitBreakerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_failure_threshold() {
        let (client, calls) = ScriptedClient::new(Script::Transport);
        let breaker = CircuitBreakerClient::new(client, fast_config());

        for _ in 0..5 {
            assert!(breaker.generate(request()).await.is_err());
        }
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // Open circuit fails fast without touching the inner client.
        assert!(breaker.generate(request()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_then_closes_on_successes() {
        let (client, _) = ScriptedClient::new(Script::Transport);
        let breaker = CircuitBreakerClient::new(client, fast_config());
        for _ in 0..5 {
            let _ = breaker.generate(request()).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::advance(Duration::from_secs(61)).await;

        // Swap behavior by rebuilding on a healthy script: simplest way to
        // model recovery with a scripted client.
        let (healthy, _) = ScriptedClient::new(Script::Ok);
        let recovered = CircuitBreakerClient {
            inner: healthy,
            config: fast_config(),
            state: Mutex::new(BreakerState {
                state: CircuitState::Open,
                failures: 5,
                successes: 0,
                last_failure: Some(Instant::now() - Duration::from_secs(61)),
            }),
        };

        assert!(recovered.generate(request()).await.is_ok());
        assert_eq!(recovered.state().await, CircuitState::HalfOpen);
        assert!(recovered.generate(request()).await.is_ok());
        assert_eq!(recovered.state().await, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_then_terminal_transport() {
        let (client, calls) = ScriptedClient::new(Script::RateLimited);
        let breaker = CircuitBreakerClient::new(client, fast_config());

        let result = breaker.generate(request()).await;
        // 1 initial + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(AgentError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_errors_do_not_trip_breaker() {
        let (client, _) = ScriptedClient::new(Script::Malformed);
        let breaker = CircuitBreakerClient::new(client, fast_config());

        for _ in 0..10 {
            let result = breaker.generate(request()).await;
            assert!(matches!(result, Err(AgentError::MalformedResponse(_))));
        }
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
