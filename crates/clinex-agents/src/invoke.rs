//! Concurrent reviewer invocation.
//!
//! All routed reviewers for one item are dispatched concurrently and the
//! whole batch is awaited; no reviewer wins by completing early. A shared
//! semaphore bounds total outstanding inference calls across every in-flight
//! item. Per-call failures of any kind become `Failed` results and never
//! abort the batch.

use std::sync::Arc;
use std::time::Instant;

use clinex_core::config::InvokerConfig;
use clinex_core::types::{AgentResult, ClinicalDataType, ValidationStatus};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::client::{InferenceClient, InferenceRequest};
use crate::item::ReviewItem;
use crate::router::AgentKind;
use crate::schema;

/// Issues reviewer calls for extracted items.
pub struct AgentInvoker {
    client: Arc<dyn InferenceClient>,
    limiter: Arc<Semaphore>,
    config: InvokerConfig,
}

impl AgentInvoker {
    /// Create an invoker with its own limiter sized from the config.
    #[must_use]
    pub fn new(client: Arc<dyn InferenceClient>, config: InvokerConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests));
        Self {
            client,
            limiter,
            config,
        }
    }

    /// Create an invoker sharing an externally owned limiter, so several
    /// pipelines respect one process-wide throughput bound.
    #[must_use]
    pub fn with_limiter(
        client: Arc<dyn InferenceClient>,
        limiter: Arc<Semaphore>,
        config: InvokerConfig,
    ) -> Self {
        Self {
            client,
            limiter,
            config,
        }
    }

    /// Call every routed reviewer for one item concurrently.
    ///
    /// The returned list matches the routed reviewer order and includes a
    /// `Failed` entry for every reviewer that timed out, failed transport,
    /// or returned a schema-invalid response.
    pub async fn review_item(
        &self,
        item: &ReviewItem,
        category: ClinicalDataType,
        agents: &[AgentKind],
    ) -> Vec<AgentResult> {
        let calls = agents.iter().map(|agent| self.call_agent(item, category, *agent));
        futures::future::join_all(calls).await
    }

    async fn call_agent(
        &self,
        item: &ReviewItem,
        category: ClinicalDataType,
        agent: AgentKind,
    ) -> AgentResult {
        // Queueing for a permit is throughput backpressure, not call time;
        // the timeout starts once the call is admitted.
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(agent = agent.name(), "limiter closed, recording failure");
                return AgentResult::failed(agent.name(), 0);
            }
        };

        let request = InferenceRequest {
            agent_name: agent.name().to_string(),
            prompt: build_prompt(agent, item, category),
            response_schema: schema::reply_schema(),
        };

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.call_timeout, self.client.generate(request))
            .await;
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => {
                warn!(
                    agent = agent.name(),
                    item = %item.id,
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "reviewer call timed out"
                );
                AgentResult::failed(agent.name(), elapsed)
            }
            Ok(Err(err)) => {
                warn!(agent = agent.name(), item = %item.id, %err, "reviewer call failed");
                AgentResult::failed(agent.name(), elapsed)
            }
            Ok(Ok(text)) => match schema::parse_reply(&text) {
                Ok(reply) => {
                    debug!(
                        agent = agent.name(),
                        item = %item.id,
                        fields = reply.extracted_fields.len(),
                        elapsed_ms = elapsed,
                        "reviewer call validated"
                    );
                    AgentResult {
                        agent_name: agent.name().to_string(),
                        overall_confidence: reply.overall_confidence,
                        extracted_fields: reply.extracted_fields,
                        source_quote: reply.source_quote,
                        insights: reply.insights,
                        validation_status: ValidationStatus::Validated,
                        processing_time_ms: elapsed,
                    }
                }
                Err(err) => {
                    warn!(agent = agent.name(), item = %item.id, %err, "reviewer response rejected");
                    AgentResult::failed(agent.name(), elapsed)
                }
            },
        }
    }
}

/// Assemble one reviewer's prompt: task instructions, item data, category
/// context, and the response contract.
fn build_prompt(agent: AgentKind, item: &ReviewItem, category: ClinicalDataType) -> String {
    format!(
        "{instructions}\n\n\
         ITEM ({kind}, id {id}, page {page}, categorized as {category}):\n\
         {body}\n\n\
         Respond with JSON only: {{\"extracted_fields\": {{\"<field>\": \
         {{\"value\": \"<string>\", \"confidence\": <0.0-1.0>}}}}, \
         \"overall_confidence\": <0.0-1.0>, \"source_quote\": \"<verbatim>\", \
         \"insights\": [\"<note>\"]}}",
        instructions = agent.instructions(),
        kind = item.kind,
        id = item.id,
        page = item.page,
        category = category,
        body = item.body,
    )
}
