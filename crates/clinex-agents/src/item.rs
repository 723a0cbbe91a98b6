//! The reviewer-facing view of one extracted item.
//!
//! Reviewers never see raster payloads or geometry; they see a serialized
//! text body built once per item and shared by the classifier and every
//! routed reviewer prompt.

use clinex_core::types::{ExtractedFigure, ExtractedTable};

/// What kind of item is under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewItemKind {
    Table,
    Figure,
}

impl std::fmt::Display for ReviewItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Figure => write!(f, "figure"),
        }
    }
}

/// Serialized item content handed to the classifier and reviewer prompts.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    /// The source item's id
    pub id: String,
    /// 1-based source page
    pub page: u32,
    pub kind: ReviewItemKind,
    /// Text body: headers and cells for tables, caption text for figures
    pub body: String,
}

impl ReviewItem {
    /// Build the reviewer view of a validated table.
    #[must_use]
    pub fn from_table(table: &ExtractedTable) -> Self {
        let mut body = table.headers.join(" | ");
        for row in &table.rows {
            body.push('\n');
            body.push_str(&row.join(" | "));
        }
        Self {
            id: table.id.clone(),
            page: table.page,
            kind: ReviewItemKind::Table,
            body,
        }
    }

    /// Build the reviewer view of a figure from its caption, when the
    /// external caption-detection step found one.
    #[must_use]
    pub fn from_figure(figure: &ExtractedFigure, caption: Option<&str>) -> Self {
        Self {
            id: figure.id.clone(),
            page: figure.page,
            kind: ReviewItemKind::Figure,
            body: caption.unwrap_or_default().to_string(),
        }
    }
}
