//! # clinex-agents
//!
//! The review half of the extraction pipeline: content classification,
//! category → reviewer routing, concurrent reviewer invocation against the
//! inference service, and deterministic consensus merging.
//!
//! The inference service is reached only through the [`InferenceClient`]
//! boundary; retry policy and rate-limit handling live in the injected
//! [`CircuitBreakerClient`] wrapper, and a shared semaphore bounds total
//! outstanding calls across every in-flight item.

pub mod circuit;
pub mod classify;
pub mod client;
pub mod consensus;
pub mod invoke;
pub mod item;
pub mod router;
pub mod schema;

pub use circuit::{CircuitBreakerClient, CircuitBreakerConfig, CircuitState};
pub use classify::{Classification, ContentClassifier, KeywordClassifier};
pub use client::{GeminiClient, InferenceClient, InferenceRequest};
pub use consensus::{build_consensus, requires_review};
pub use invoke::AgentInvoker;
pub use item::{ReviewItem, ReviewItemKind};
pub use router::{AgentKind, AgentRouter};
pub use schema::{parse_reply, reply_schema, ParsedReply};
