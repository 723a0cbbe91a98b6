//! Reviewer reply schema and validated parsing.
//!
//! Reviewer responses arrive as untyped structured text. Nothing is trusted
//! until the reply parses against the fixed schema and every confidence is
//! range-checked; any failure is a [`AgentError::MalformedResponse`], which
//! records the reviewer as failed without touching the rest of the batch.

use std::collections::BTreeMap;

use clinex_core::error::{AgentCallResult, AgentError};
use clinex_core::types::FieldScore;
use serde::Deserialize;

/// The fixed JSON schema every reviewer response must conform to, sent with
/// each request so the inference service constrains its output.
#[must_use]
pub fn reply_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "extracted_fields": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "string"},
                        "confidence": {"type": "number"}
                    },
                    "required": ["value", "confidence"]
                }
            },
            "overall_confidence": {"type": "number"},
            "source_quote": {"type": "string"},
            "insights": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["extracted_fields", "overall_confidence"]
    })
}

#[derive(Debug, Deserialize)]
struct WireReply {
    extracted_fields: BTreeMap<String, WireField>,
    overall_confidence: f64,
    #[serde(default)]
    source_quote: String,
    #[serde(default)]
    insights: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireField {
    value: serde_json::Value,
    confidence: f64,
}

/// A schema-valid reviewer reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub extracted_fields: BTreeMap<String, FieldScore>,
    pub overall_confidence: f64,
    pub source_quote: String,
    pub insights: Vec<String>,
}

/// Parse and validate one reviewer response.
///
/// # Errors
///
/// [`AgentError::MalformedResponse`] when the text does not decode against
/// the reply schema or any confidence falls outside [0, 1].
pub fn parse_reply(text: &str) -> AgentCallResult<ParsedReply> {
    let json = strip_fences(text);
    let wire: WireReply = serde_json::from_str(json)
        .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;

    if !(0.0..=1.0).contains(&wire.overall_confidence) {
        return Err(AgentError::MalformedResponse(format!(
            "overall_confidence {} outside [0, 1]",
            wire.overall_confidence
        )));
    }

    let mut extracted_fields = BTreeMap::new();
    for (name, field) in wire.extracted_fields {
        if !(0.0..=1.0).contains(&field.confidence) {
            return Err(AgentError::MalformedResponse(format!(
                "field '{name}' confidence {} outside [0, 1]",
                field.confidence
            )));
        }
        let value = match field.value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => continue,
            other => other.to_string(),
        };
        extracted_fields.insert(
            name,
            FieldScore {
                value,
                confidence: field.confidence,
            },
        );
    }

    Ok(ParsedReply {
        extracted_fields,
        overall_confidence: wire.overall_confidence,
        source_quote: wire.source_quote,
        insights: wire.insights,
    })
}

/// Tolerate markdown code fences and leading chatter around the JSON object.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.split_once('\n').map_or(rest, |(_, tail)| tail);
        rest.rsplit_once("```").map_or(rest, |(head, _)| head)
    } else {
        trimmed
    };

    match (body.find('{'), body.rfind('}')) {
        (Some(open), Some(close)) if close > open => &body[open..=close],
        _ => body,
    }
}
