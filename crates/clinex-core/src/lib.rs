//! # clinex-core
//!
//! Shared data model, geometry, configuration, and error taxonomy for the
//! clinex extraction pipeline.
//!
//! The pipeline extracts tables and figures from scanned research-paper
//! pages by geometric analysis, classifies each item by clinical-data
//! category, fans it out to specialized AI reviewers, and merges their
//! independent judgments into a single confidence-scored consensus. This
//! crate holds the types every stage exchanges:
//!
//! - Upstream geometry: [`TextRun`], [`ImageOperator`]
//! - Extraction output: [`ExtractedTable`], [`ExtractedFigure`]
//! - Review results: [`AgentResult`], [`ConsensusResult`]
//! - Final records: [`EnhancedTable`], [`EnhancedFigure`], [`PipelineStats`]

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::{ClassifierConfig, ConsensusConfig, InvokerConfig, LayoutConfig};
pub use error::{AgentCallResult, AgentError};
pub use geometry::{BoundingBox, PageTransform};
pub use types::{
    AgentResult, ClinicalDataType, ColorSpace, ConsensusResult, EnhancedFigure, EnhancedTable,
    ExtractedFigure, ExtractedTable, FieldScore, ImageOperator, ImageOperatorKind, MergedField,
    PipelineStats, TextRun, ValidationStatus,
};
