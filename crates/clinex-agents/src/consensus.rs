//! Consensus merging of one item's reviewer results.
//!
//! A pure function of its input: identical `AgentResult` sets always
//! reproduce identical output, with no time- or order-dependence beyond the
//! set itself. Failed results are discarded up front; the structural
//! validator supplies a confidence floor but never outranks a semantic
//! reviewer for the primary slot.

use std::collections::BTreeMap;

use clinex_core::config::ConsensusConfig;
use clinex_core::types::{AgentResult, ConsensusResult, MergedField};

use crate::router::AgentKind;

/// Merge one item's closed reviewer result set into its final verdict.
#[must_use = "consensus is the item's final verdict"]
pub fn build_consensus(results: &[AgentResult], config: &ConsensusConfig) -> ConsensusResult {
    let mut survivors: Vec<&AgentResult> = results.iter().filter(|r| r.is_validated()).collect();
    if survivors.is_empty() {
        return ConsensusResult::default();
    }

    // Deterministic selection: semantic reviewers outrank the structural
    // validator, then confidence, then name.
    survivors.sort_by(|a, b| {
        is_structural(&a.agent_name)
            .cmp(&is_structural(&b.agent_name))
            .then(b.overall_confidence.total_cmp(&a.overall_confidence))
            .then(a.agent_name.cmp(&b.agent_name))
    });

    let primary = survivors[0];
    let supporters = &survivors[1..];

    let consensus_confidence = if supporters.is_empty() {
        primary.overall_confidence
    } else {
        let support_mean = supporters
            .iter()
            .map(|r| r.overall_confidence)
            .sum::<f64>()
            / supporters.len() as f64;
        config.primary_weight * primary.overall_confidence
            + config.supporting_weight * support_mean
    }
    .clamp(0.0, 1.0);

    let mut merged_fields: BTreeMap<String, MergedField> = primary
        .extracted_fields
        .iter()
        .map(|(name, field)| {
            (
                name.clone(),
                MergedField {
                    value: field.value.clone(),
                    confidence: field.confidence,
                    source_agent: primary.agent_name.clone(),
                    conflict_resolved: false,
                },
            )
        })
        .collect();

    // Supporters iterate name-sorted for reproducibility.
    let mut by_name: Vec<&&AgentResult> = supporters.iter().collect();
    by_name.sort_by(|a, b| a.agent_name.cmp(&b.agent_name));
    for supporter in by_name {
        for (name, field) in &supporter.extracted_fields {
            match merged_fields.get_mut(name) {
                Some(existing) => {
                    if field.confidence > existing.confidence + config.conflict_margin {
                        *existing = MergedField {
                            value: field.value.clone(),
                            confidence: field.confidence,
                            source_agent: supporter.agent_name.clone(),
                            conflict_resolved: true,
                        };
                    }
                }
                None => {
                    merged_fields.insert(
                        name.clone(),
                        MergedField {
                            value: field.value.clone(),
                            confidence: field.confidence,
                            source_agent: supporter.agent_name.clone(),
                            conflict_resolved: false,
                        },
                    );
                }
            }
        }
    }

    ConsensusResult {
        primary_agent: Some(primary.agent_name.clone()),
        consensus_confidence,
        supporting_agents: supporters.iter().map(|r| r.agent_name.clone()).collect(),
        merged_fields,
    }
}

/// Whether an item needs manual review: low consensus confidence or no
/// supporting reviewer at all.
#[must_use]
pub fn requires_review(consensus: &ConsensusResult, config: &ConsensusConfig) -> bool {
    consensus.consensus_confidence < config.review_threshold
        || consensus.supporting_agents.is_empty()
}

fn is_structural(agent_name: &str) -> bool {
    agent_name == AgentKind::StructureValidator.name()
}
