//! Content classification.
//!
//! The default classifier is an intentionally simple keyword scorer behind
//! the [`ContentClassifier`] strategy trait, so a statistical or learned
//! replacement can drop in without touching routing or consensus.

use std::collections::HashSet;

use clinex_core::config::ClassifierConfig;
use clinex_core::types::ClinicalDataType;

use crate::item::ReviewItem;

/// A category assignment with its normalized score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub category: ClinicalDataType,
    /// Normalized score of the winning category, in [0, 1]
    pub confidence: f64,
}

/// Swappable classification strategy.
pub trait ContentClassifier: Send + Sync {
    /// Assign a clinical-data category to one item.
    fn classify(&self, item: &ReviewItem) -> Classification;
}

/// Keyword-dictionary classifier.
///
/// Scores each category by the fraction of its dictionary found in the
/// item's text; ties break on the fixed category priority order; scores
/// below the minimum threshold yield `unclassified`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    config: ClassifierConfig,
}

/// Per-category keyword dictionaries. Kept disjoint so that text drawn from
/// one dictionary always scores that category strictly highest.
const DICTIONARIES: [(ClinicalDataType, &[&str]); 5] = [
    (
        ClinicalDataType::PatientDemographics,
        &[
            "age", "sex", "gender", "male", "female", "demographic", "baseline", "bmi",
            "ethnicity", "cohort", "characteristics", "comorbidity",
        ],
    ),
    (
        ClinicalDataType::SurgicalProcedures,
        &[
            "surgery", "surgical", "procedure", "resection", "craniotomy", "operative",
            "approach", "incision", "anesthesia", "laminectomy", "implant", "intraoperative",
        ],
    ),
    (
        ClinicalDataType::OutcomesStatistics,
        &[
            "outcome", "mortality", "survival", "p value", "confidence interval", "odds ratio",
            "hazard ratio", "complication", "follow-up", "improvement", "recurrence", "gos",
        ],
    ),
    (
        ClinicalDataType::NeuroimagingData,
        &[
            "mri", "ct", "imaging", "scan", "t1", "t2", "flair", "contrast", "lesion",
            "angiography", "dwi", "volumetric",
        ],
    ),
    (
        ClinicalDataType::StudyMethodology,
        &[
            "randomized", "retrospective", "prospective", "inclusion", "exclusion", "criteria",
            "protocol", "blinded", "trial", "enrollment", "methods", "allocation",
        ],
    ),
];

impl KeywordClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    fn score(text_lc: &str, words: &HashSet<&str>, dictionary: &[&str]) -> f64 {
        let matched = dictionary
            .iter()
            .filter(|keyword| {
                if keyword.contains(' ') {
                    text_lc.contains(*keyword)
                } else {
                    words.contains(*keyword)
                }
            })
            .count();
        matched as f64 / dictionary.len() as f64
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, item: &ReviewItem) -> Classification {
        let text_lc = item.body.to_lowercase();
        let words: HashSet<&str> = text_lc
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|token| !token.is_empty())
            .collect();

        let mut best_category = ClinicalDataType::Unclassified;
        let mut best_score = 0.0;
        // Dictionaries iterate in priority order, so strict comparison keeps
        // the higher-priority category on ties.
        for (category, dictionary) in DICTIONARIES {
            let score = Self::score(&text_lc, &words, dictionary);
            if score > best_score {
                best_category = category;
                best_score = score;
            }
        }

        if best_score < self.config.min_score {
            Classification {
                category: ClinicalDataType::Unclassified,
                confidence: best_score,
            }
        } else {
            Classification {
                category: best_category,
                confidence: best_score,
            }
        }
    }
}
