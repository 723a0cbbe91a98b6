//! Category-to-reviewer routing.
//!
//! The routing table is a pure, immutable configuration value built once and
//! injected read-only; every lookup additionally appends the structural
//! validation reviewer, which runs regardless of category and provides a
//! confidence floor independent of semantic content.

use std::collections::HashMap;

use clinex_core::types::ClinicalDataType;

/// The closed set of reviewer identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Baseline population characteristics
    DemographicsReviewer,
    /// Operative technique details
    ProcedureReviewer,
    /// Outcome measures and statistics
    OutcomesReviewer,
    /// Imaging findings and measurements
    ImagingReviewer,
    /// Study design and protocol details
    MethodologyReviewer,
    /// Fallback semantic reviewer for unclassified items
    GeneralReviewer,
    /// Shape and header sanity-checking; always routed
    StructureValidator,
}

impl AgentKind {
    /// Stable wire identity of the reviewer.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DemographicsReviewer => "demographics_reviewer",
            Self::ProcedureReviewer => "procedure_reviewer",
            Self::OutcomesReviewer => "outcomes_reviewer",
            Self::ImagingReviewer => "imaging_reviewer",
            Self::MethodologyReviewer => "methodology_reviewer",
            Self::GeneralReviewer => "general_reviewer",
            Self::StructureValidator => "structure_validator",
        }
    }

    /// Task instructions prepended to the reviewer's prompt.
    #[must_use]
    pub const fn instructions(&self) -> &'static str {
        match self {
            Self::DemographicsReviewer => {
                "You are a clinical demographics reviewer. Extract population \
                 characteristics: sample size, age, sex distribution, and baseline traits."
            }
            Self::ProcedureReviewer => {
                "You are a surgical procedure reviewer. Extract operative techniques, \
                 approaches, and procedure-level details."
            }
            Self::OutcomesReviewer => {
                "You are an outcomes reviewer. Extract outcome measures, effect sizes, \
                 significance statistics, and complication rates."
            }
            Self::ImagingReviewer => {
                "You are a neuroimaging reviewer. Extract imaging modalities, sequences, \
                 measurements, and lesion findings."
            }
            Self::MethodologyReviewer => {
                "You are a study methodology reviewer. Extract study design, enrollment \
                 criteria, and protocol details."
            }
            Self::GeneralReviewer => {
                "You are a clinical data reviewer. Extract every named value this item \
                 reports, with the most precise field names the content supports."
            }
            Self::StructureValidator => {
                "You are a structural validator. Judge whether this item is coherent \
                 tabular or figure content: consistent columns, plausible headers, \
                 units that match their values. Do not extract semantic content."
            }
        }
    }

    /// True for the always-routed structural reviewer.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::StructureValidator)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "demographics_reviewer" | "demographics" => Ok(Self::DemographicsReviewer),
            "procedure_reviewer" | "procedures" => Ok(Self::ProcedureReviewer),
            "outcomes_reviewer" | "outcomes" => Ok(Self::OutcomesReviewer),
            "imaging_reviewer" | "imaging" => Ok(Self::ImagingReviewer),
            "methodology_reviewer" | "methodology" => Ok(Self::MethodologyReviewer),
            "general_reviewer" | "general" => Ok(Self::GeneralReviewer),
            "structure_validator" | "structure" => Ok(Self::StructureValidator),
            _ => Err(format!("unknown reviewer '{s}'")),
        }
    }
}

/// Immutable category → ordered reviewer lookup.
#[derive(Debug, Clone)]
pub struct AgentRouter {
    table: HashMap<ClinicalDataType, Vec<AgentKind>>,
}

impl AgentRouter {
    /// The standard routing table: one specialized reviewer per category,
    /// the general reviewer for unclassified items.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = HashMap::new();
        table.insert(
            ClinicalDataType::PatientDemographics,
            vec![AgentKind::DemographicsReviewer],
        );
        table.insert(
            ClinicalDataType::SurgicalProcedures,
            vec![AgentKind::ProcedureReviewer],
        );
        table.insert(
            ClinicalDataType::OutcomesStatistics,
            vec![AgentKind::OutcomesReviewer],
        );
        table.insert(
            ClinicalDataType::NeuroimagingData,
            vec![AgentKind::ImagingReviewer],
        );
        table.insert(
            ClinicalDataType::StudyMethodology,
            vec![AgentKind::MethodologyReviewer],
        );
        table.insert(
            ClinicalDataType::Unclassified,
            vec![AgentKind::GeneralReviewer],
        );
        Self { table }
    }

    /// Build a router from a custom table. The structural validator is still
    /// appended on every lookup and need not appear in the table.
    #[must_use]
    pub fn new(table: HashMap<ClinicalDataType, Vec<AgentKind>>) -> Self {
        Self { table }
    }

    /// The ordered reviewer list for one category, always ending with the
    /// structural validator.
    #[must_use]
    pub fn route(&self, category: ClinicalDataType) -> Vec<AgentKind> {
        let mut agents = self
            .table
            .get(&category)
            .cloned()
            .unwrap_or_else(|| vec![AgentKind::GeneralReviewer]);
        if !agents.contains(&AgentKind::StructureValidator) {
            agents.push(AgentKind::StructureValidator);
        }
        agents
    }
}

impl Default for AgentRouter {
    fn default() -> Self {
        Self::standard()
    }
}
