//! Table validation.
//!
//! Filters clustered candidates down to genuine tables, rejecting prose the
//! clusterer accidentally grouped. Each rule catches a distinct false-positive
//! mode seen with body text: sparse columns, narrow content, wrapped sentence
//! fragments, single-letter "headers". Rejection is a normal outcome, not an
//! error; the [`RejectReason`] exists for diagnostics only.

use clinex_core::config::LayoutConfig;

use crate::cluster::TableCandidate;

/// Which validation rule rejected a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer data rows or columns than the structural minimum
    InsufficientStructure { rows: usize, columns: usize },
    /// Fewer than three content-rich rows survived the content-ratio rule
    ContentPoor { content_rich_rows: usize },
    /// Dropping wrapped-fragment rows left too few rows
    FragmentRows { remaining_rows: usize },
    /// Failed both the numeric-ratio and header-quality gates
    ImplausibleCells,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientStructure { rows, columns } => {
                write!(f, "insufficient structure ({rows} rows x {columns} columns)")
            }
            Self::ContentPoor { content_rich_rows } => {
                write!(f, "only {content_rich_rows} content-rich rows")
            }
            Self::FragmentRows { remaining_rows } => {
                write!(f, "only {remaining_rows} rows after dropping fragments")
            }
            Self::ImplausibleCells => write!(f, "cells implausible for tabular data"),
        }
    }
}

/// A candidate that survived validation.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    /// Header row cells
    pub headers: Vec<String>,
    /// Surviving data rows
    pub rows: Vec<Vec<String>>,
    /// Weighted structural confidence in [0, 1]
    pub structure_confidence: f64,
}

/// Apply the validation rules in order, rejecting on the first failure.
///
/// # Errors
///
/// Returns the [`RejectReason`] of the first failed rule. Callers treat this
/// as a filtered candidate, never as a pipeline failure.
pub fn validate_candidate(
    candidate: &TableCandidate,
    config: &LayoutConfig,
) -> Result<ValidatedTable, RejectReason> {
    let columns = candidate.column_positions.len();
    let (headers, data) = match candidate.grid.split_first() {
        Some((headers, data)) => (headers.clone(), data),
        None => {
            return Err(RejectReason::InsufficientStructure { rows: 0, columns });
        }
    };

    // Rule 1: structural minimum.
    if data.len() < config.min_table_rows || columns < config.min_table_columns {
        return Err(RejectReason::InsufficientStructure {
            rows: data.len(),
            columns,
        });
    }

    // Rule 2/3: enough rows must carry real content.
    let content_rich_rows = data
        .iter()
        .filter(|row| row_content_ratio(row, config) >= config.content_ratio_threshold)
        .count();
    if content_rich_rows < 3 {
        return Err(RejectReason::ContentPoor { content_rich_rows });
    }

    // Rule 4: drop rows that are entirely a couple of short tokens.
    let rows: Vec<Vec<String>> = data
        .iter()
        .filter(|row| !is_fragment_row(row, config))
        .cloned()
        .collect();
    if rows.len() < config.min_table_rows {
        return Err(RejectReason::FragmentRows {
            remaining_rows: rows.len(),
        });
    }

    // Rule 5: numeric plausibility, with a header-quality fallback.
    let numeric_ratio = numeric_cell_ratio(&rows);
    let header_quality = header_quality(&headers);
    if numeric_ratio < config.numeric_ratio_threshold && header_quality < 0.5 {
        return Err(RejectReason::ImplausibleCells);
    }

    let content_ratio = content_rich_rows as f64 / data.len() as f64;
    let structure_confidence =
        (0.5 * content_ratio + 0.3 * numeric_ratio + 0.2 * header_quality).clamp(0.0, 1.0);

    Ok(ValidatedTable {
        headers,
        rows,
        structure_confidence,
    })
}

/// Fraction of a row's cells whose text exceeds the short-token threshold.
fn row_content_ratio(row: &[String], config: &LayoutConfig) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let rich = row
        .iter()
        .filter(|cell| cell.trim().chars().count() > config.short_token_len)
        .count();
    rich as f64 / row.len() as f64
}

/// A wrapped sentence fragment: at most two populated cells, all short.
fn is_fragment_row(row: &[String], config: &LayoutConfig) -> bool {
    let populated: Vec<&String> = row.iter().filter(|cell| !cell.trim().is_empty()).collect();
    populated.len() <= 2
        && populated
            .iter()
            .all(|cell| cell.trim().chars().count() <= config.short_token_len)
}

/// Fraction of populated cells that read as numeric values.
fn numeric_cell_ratio(rows: &[Vec<String>]) -> f64 {
    let mut populated = 0usize;
    let mut numeric = 0usize;
    for row in rows {
        for cell in row {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                continue;
            }
            populated += 1;
            if is_numeric_cell(trimmed) {
                numeric += 1;
            }
        }
    }
    if populated == 0 {
        0.0
    } else {
        numeric as f64 / populated as f64
    }
}

/// Numeric-looking cell text: digits plus the punctuation common in reported
/// values (`12.3`, `45%`, `3.1 ± 0.4`, `(n=12)`, `17/20`).
fn is_numeric_cell(text: &str) -> bool {
    let mut has_digit = false;
    for c in text.chars() {
        if c.is_ascii_digit() {
            has_digit = true;
        } else if !matches!(
            c,
            '.' | ',' | '%' | '±' | '-' | '–' | '(' | ')' | '/' | ':' | '=' | '<' | '>' | ' '
                | 'n' | 'p'
        ) {
            return false;
        }
    }
    has_digit
}

/// Fraction of header cells longer than a single character.
fn header_quality(headers: &[String]) -> f64 {
    if headers.is_empty() {
        return 0.0;
    }
    let single_char = headers
        .iter()
        .filter(|cell| cell.trim().chars().count() <= 1)
        .count();
    1.0 - single_char as f64 / headers.len() as f64
}
