//! Pipeline configuration.
//!
//! The source of these values evolved inconsistent clustering tolerances
//! over time; this module fixes one documented set and exposes every
//! threshold as configuration rather than a constant buried in an algorithm.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Geometric extraction thresholds for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Max y-distance (px) between fragments of the same row
    pub row_tolerance_px: f64,
    /// Max x-distance (px) between a fragment and its column's mean position
    pub column_tolerance_px: f64,
    /// Minimum rows for a candidate to count as a table
    pub min_table_rows: usize,
    /// Minimum columns for a candidate to count as a table
    pub min_table_columns: usize,
    /// Cell text at or below this length counts as a short token
    pub short_token_len: usize,
    /// Minimum fraction of content-rich cells for a row to count
    pub content_ratio_threshold: f64,
    /// Minimum overall numeric-cell ratio for the plausibility gate
    pub numeric_ratio_threshold: f64,
    /// Minimum width and height (page units) for a figure footprint
    pub min_figure_extent_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_tolerance_px: 4.0,
            column_tolerance_px: 8.0,
            min_table_rows: 4,
            min_table_columns: 2,
            short_token_len: 2,
            content_ratio_threshold: 0.5,
            numeric_ratio_threshold: 0.3,
            min_figure_extent_px: 50.0,
        }
    }
}

impl LayoutConfig {
    /// Override the row clustering tolerance.
    #[must_use]
    pub fn with_row_tolerance(mut self, px: f64) -> Self {
        self.row_tolerance_px = px;
        self
    }

    /// Override the column clustering tolerance.
    #[must_use]
    pub fn with_column_tolerance(mut self, px: f64) -> Self {
        self.column_tolerance_px = px;
        self
    }

    /// Override the minimum figure footprint.
    #[must_use]
    pub fn with_min_figure_extent(mut self, px: f64) -> Self {
        self.min_figure_extent_px = px;
        self
    }
}

/// Keyword classification threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Normalized scores below this yield `unclassified`
    pub min_score: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_score: 0.05 }
    }
}

/// Reviewer invocation limits.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokerConfig {
    /// Bounded per-call timeout
    pub call_timeout: Duration,
    /// Process-wide cap on concurrent outbound inference calls
    pub max_concurrent_requests: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            max_concurrent_requests: 5,
        }
    }
}

impl InvokerConfig {
    /// Override the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the outbound concurrency cap.
    #[must_use]
    pub fn with_max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n.max(1);
        self
    }
}

/// Consensus weighting and review flagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Weight of the primary reviewer's confidence in the blend
    pub primary_weight: f64,
    /// Weight shared across supporting reviewers
    pub supporting_weight: f64,
    /// A supporter's field confidence must exceed the primary's by more than
    /// this margin to displace its value
    pub conflict_margin: f64,
    /// Items below this consensus confidence are flagged for manual review
    pub review_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            primary_weight: 0.7,
            supporting_weight: 0.3,
            conflict_margin: 0.1,
            review_threshold: 0.5,
        }
    }
}
