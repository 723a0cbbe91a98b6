//! Data model for the extraction pipeline.
//!
//! This module defines the structures exchanged between the pipeline stages:
//!
//! - [`TextRun`] / [`ImageOperator`] - upstream page geometry (immutable)
//! - [`ExtractedTable`] / [`ExtractedFigure`] - geometric extraction output
//! - [`ClinicalDataType`] - closed content-category enumeration
//! - [`AgentResult`] - one reviewer's independent judgment of one item
//! - [`ConsensusResult`] - the merged, confidence-scored final verdict
//! - [`EnhancedTable`] / [`EnhancedFigure`] - the unit handed downstream
//! - [`PipelineStats`] - aggregate statistics for the export collaborators

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, PageTransform};

/// A positioned text fragment, produced once per page by the upstream
/// rendering collaborator and consumed only by the row/column clusterer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Left edge x-coordinate in page space
    pub x: f64,
    /// Top edge y-coordinate in page space
    pub y: f64,
    /// Fragment width
    pub width: f64,
    /// Fragment height
    pub height: f64,
    /// Fragment text content
    pub text: String,
}

impl TextRun {
    /// The fragment's page-space bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Declared color space of an intercepted raster buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// 3 bytes per pixel, passes through with opacity forced to full
    Rgb,
    /// 1 byte per pixel, replicated into R/G/B
    Grayscale,
    /// 4 bytes per pixel, subtractive-to-additive converted
    Cmyk,
}

/// The three drawing-operator kinds that paint raster content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOperatorKind {
    ImageMask,
    ImageObject,
    InlineImage,
}

/// A raster drawing operator intercepted before rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOperator {
    /// Which operator kind painted this buffer
    pub kind: ImageOperatorKind,
    /// Raw pixel buffer in the declared color space
    pub data: Vec<u8>,
    /// Declared color space of `data`
    pub color_space: ColorSpace,
    /// Pixel width of the buffer
    pub width: u32,
    /// Pixel height of the buffer
    pub height: u32,
    /// Placement transform mapping the unit square into page space
    pub transform: PageTransform,
}

/// A validated table extracted from one page.
///
/// Created by the clusterer + validator pair; immutable thereafter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Stable item identifier, unique within a document
    pub id: String,
    /// 1-based page number
    pub page: u32,
    /// Header row cells
    pub headers: Vec<String>,
    /// Data row cells, aligned to `column_positions`
    pub rows: Vec<Vec<String>>,
    /// Column x-positions, strictly ascending
    pub column_positions: Vec<f64>,
    /// Page-space footprint of the whole table
    pub bounding_box: BoundingBox,
    /// Structural confidence from validation, in [0, 1]
    pub structure_confidence: f64,
}

/// A raster figure reconstructed from intercepted drawing operators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFigure {
    /// Stable item identifier, unique within a document
    pub id: String,
    /// 1-based page number
    pub page: u32,
    /// Base64-encoded PNG payload
    pub raster_data: String,
    /// Page-space footprint from the placement transform
    pub bounding_box: BoundingBox,
    /// Pixel width of the source buffer
    pub width: u32,
    /// Pixel height of the source buffer
    pub height: u32,
}

/// Clinical-data categories assigned by the content classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalDataType {
    /// Baseline population characteristics (age, sex, cohort size)
    PatientDemographics,
    /// Operative technique and procedure details
    SurgicalProcedures,
    /// Outcome measures, effect sizes, significance statistics
    OutcomesStatistics,
    /// Imaging modality findings and measurements
    NeuroimagingData,
    /// Study design, enrollment, and protocol details
    StudyMethodology,
    /// No category scored above the classification threshold
    #[default]
    Unclassified,
}

impl ClinicalDataType {
    /// Fixed tie-break order for classification: lower rank wins.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::PatientDemographics => 0,
            Self::SurgicalProcedures => 1,
            Self::OutcomesStatistics => 2,
            Self::NeuroimagingData => 3,
            Self::StudyMethodology => 4,
            Self::Unclassified => 5,
        }
    }

    /// All classifiable categories, in priority order.
    #[must_use]
    pub const fn classifiable() -> [Self; 5] {
        [
            Self::PatientDemographics,
            Self::SurgicalProcedures,
            Self::OutcomesStatistics,
            Self::NeuroimagingData,
            Self::StudyMethodology,
        ]
    }
}

impl std::fmt::Display for ClinicalDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PatientDemographics => "patient_demographics",
            Self::SurgicalProcedures => "surgical_procedures",
            Self::OutcomesStatistics => "outcomes_statistics",
            Self::NeuroimagingData => "neuroimaging_data",
            Self::StudyMethodology => "study_methodology",
            Self::Unclassified => "unclassified",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ClinicalDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient_demographics" | "demographics" => Ok(Self::PatientDemographics),
            "surgical_procedures" | "procedures" => Ok(Self::SurgicalProcedures),
            "outcomes_statistics" | "outcomes" => Ok(Self::OutcomesStatistics),
            "neuroimaging_data" | "neuroimaging" | "imaging" => Ok(Self::NeuroimagingData),
            "study_methodology" | "methodology" => Ok(Self::StudyMethodology),
            "unclassified" => Ok(Self::Unclassified),
            _ => Err(format!("unknown clinical data type '{s}'")),
        }
    }
}

/// One extracted field with the reviewer's field-level confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    /// Extracted value, normalized to a string
    pub value: String,
    /// Field-level confidence in [0, 1]
    pub confidence: f64,
}

/// Whether a reviewer call produced a usable, schema-valid response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Response parsed and validated against the reply schema
    Validated,
    /// Timeout, transport failure, or schema-invalid response
    #[default]
    Failed,
}

/// One reviewer's independent judgment of one extracted item.
///
/// Discarded after the merge, except for audit retention by an external
/// collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Stable reviewer identity (e.g. `demographics_reviewer`)
    pub agent_name: String,
    /// Reviewer's overall confidence in [0, 1]; 0 for failed calls
    pub overall_confidence: f64,
    /// Named fields the reviewer extracted
    pub extracted_fields: BTreeMap<String, FieldScore>,
    /// Verbatim quote the reviewer grounded its extraction on
    pub source_quote: String,
    /// Free-form reviewer observations
    pub insights: Vec<String>,
    /// Whether the call produced a schema-valid response
    pub validation_status: ValidationStatus,
    /// Wall-clock duration of the call in milliseconds
    pub processing_time_ms: u64,
}

impl AgentResult {
    /// A failed-call placeholder, recorded so the batch stays closed over
    /// the routed reviewer set.
    #[must_use]
    pub fn failed(agent_name: &str, processing_time_ms: u64) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            overall_confidence: 0.0,
            extracted_fields: BTreeMap::new(),
            source_quote: String::new(),
            insights: Vec::new(),
            validation_status: ValidationStatus::Failed,
            processing_time_ms,
        }
    }

    /// True when the call produced a usable response.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validation_status == ValidationStatus::Validated
    }
}

/// A consensus-merged field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    /// The winning value
    pub value: String,
    /// The winning field-level confidence
    pub confidence: f64,
    /// Which reviewer supplied the winning value
    pub source_agent: String,
    /// True when a supporting reviewer's value displaced the primary's
    pub conflict_resolved: bool,
}

/// The merged verdict for one item, computed exactly once from that item's
/// closed [`AgentResult`] set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Highest-confidence surviving reviewer; `None` when every call failed
    pub primary_agent: Option<String>,
    /// Weighted aggregate trust score in [0, 1]
    pub consensus_confidence: f64,
    /// Surviving reviewers other than the primary
    pub supporting_agents: Vec<String>,
    /// Field-merged output across all surviving reviewers
    pub merged_fields: BTreeMap<String, MergedField>,
}

/// A validated table plus its classification and reviewer consensus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTable {
    pub table: ExtractedTable,
    /// Assigned clinical-data category
    pub category: ClinicalDataType,
    /// Normalized classification score of the winning category
    pub classification_confidence: f64,
    /// Every routed reviewer's result, including failures
    pub agent_results: Vec<AgentResult>,
    pub consensus: ConsensusResult,
    /// Set when consensus confidence is below the review threshold or the
    /// supporting-reviewer set is empty
    pub requires_review: bool,
}

/// An extracted figure plus its classification and reviewer consensus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedFigure {
    pub figure: ExtractedFigure,
    /// Nearby caption text, when the external caption-detection step found one
    pub caption: Option<String>,
    pub category: ClinicalDataType,
    pub classification_confidence: f64,
    pub agent_results: Vec<AgentResult>,
    pub consensus: ConsensusResult,
    pub requires_review: bool,
}

/// Aggregate pipeline statistics for the downstream export collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Tables that completed the full pipeline
    pub tables_processed: usize,
    /// Figures that completed the full pipeline
    pub figures_processed: usize,
    /// Total reviewer calls issued
    pub reviewer_calls: usize,
    /// Reviewer calls that timed out, failed transport, or failed schema
    pub failed_reviewer_calls: usize,
    /// Mean consensus confidence across processed items
    pub avg_consensus_confidence: f64,
    /// Wall-clock pipeline duration in milliseconds
    pub elapsed_ms: u64,
}
