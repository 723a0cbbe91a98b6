//! # clinex-layout
//!
//! Geometric extraction of tables and figures from one page of positioned
//! content: row/column clustering of text fragments, structural validation
//! of the resulting candidates, and raster figure reconstruction from
//! intercepted drawing operators.
//!
//! All work here is synchronous CPU work; absence of structure is a normal
//! outcome, never an error.

pub mod cluster;
pub mod figures;
pub mod validate;

pub use cluster::{cluster_rows, find_candidates, RowCluster, TableCandidate};
pub use figures::extract_figures;
pub use validate::{validate_candidate, RejectReason, ValidatedTable};

use clinex_core::config::LayoutConfig;
use clinex_core::types::{ExtractedTable, TextRun};
use tracing::debug;

/// Detect validated tables on one page.
///
/// Composes the clusterer and validator: fragments are clustered into
/// candidate regions, each candidate is validated, and survivors become
/// [`ExtractedTable`]s with document-stable ids.
#[must_use]
pub fn detect_tables(page: u32, runs: &[TextRun], config: &LayoutConfig) -> Vec<ExtractedTable> {
    let rows = cluster::cluster_rows(runs, config);
    let candidates = cluster::find_candidates(&rows, config);

    let mut tables = Vec::new();
    for candidate in candidates {
        match validate::validate_candidate(&candidate, config) {
            Ok(validated) => {
                tables.push(ExtractedTable {
                    id: format!("p{page}_table{}", tables.len() + 1),
                    page,
                    headers: validated.headers,
                    rows: validated.rows,
                    column_positions: candidate.column_positions,
                    bounding_box: candidate.bounding_box,
                    structure_confidence: validated.structure_confidence,
                });
            }
            Err(reason) => {
                debug!(page, %reason, "candidate rejected");
            }
        }
    }
    tables
}
