//! End-to-end pipeline tests against a scripted inference client.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clinex_agents::{InferenceClient, InferenceRequest};
use clinex_core::error::{AgentCallResult, AgentError};
use clinex_core::geometry::PageTransform;
use clinex_core::types::{ClinicalDataType, ColorSpace, ImageOperator, ImageOperatorKind, TextRun};
use clinex_pipeline::{CancelToken, ExtractionPipeline, NoCaptions, PageContent};
use futures::future::BoxFuture;

/// Scripted client: per-agent replies, optional slowdown for chosen items.
struct ScriptedClient {
    /// Substring of the prompt that triggers the slow path
    slow_marker: Option<&'static str>,
    slow_delay: Duration,
    fail_all: bool,
    calls: AtomicU32,
}

impl ScriptedClient {
    fn healthy() -> Self {
        Self {
            slow_marker: None,
            slow_delay: Duration::ZERO,
            fail_all: false,
            calls: AtomicU32::new(0),
        }
    }

    fn slow_on(marker: &'static str, delay: Duration) -> Self {
        Self {
            slow_marker: Some(marker),
            slow_delay: delay,
            ..Self::healthy()
        }
    }

    fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::healthy()
        }
    }

    fn reply(confidence: f64) -> String {
        format!(
            r#"{{
                "extracted_fields": {{
                    "sample_size": {{"value": "40", "confidence": {confidence}}}
                }},
                "overall_confidence": {confidence},
                "source_quote": "forty patients",
                "insights": []
            }}"#
        )
    }
}

impl InferenceClient for ScriptedClient {
    fn generate(&self, request: InferenceRequest) -> BoxFuture<'_, AgentCallResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(marker) = self.slow_marker {
                if request.prompt.contains(marker) {
                    tokio::time::sleep(self.slow_delay).await;
                } else {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
            if self.fail_all {
                return Err(AgentError::Transport("service down".to_string()));
            }
            match request.agent_name.as_str() {
                "structure_validator" => Ok(Self::reply(1.0)),
                "demographics_reviewer" => Ok(Self::reply(0.9)),
                _ => Ok(Self::reply(0.8)),
            }
        })
    }
}

fn run(text: &str, x: f64, y: f64) -> TextRun {
    TextRun {
        x,
        y,
        width: text.len() as f64 * 5.0,
        height: 10.0,
        text: text.to_string(),
    }
}

/// A 5-row demographics table laid out as positioned fragments.
fn demographics_runs(y_offset: f64) -> Vec<TextRun> {
    let cells = [
        ["Age", "Sex", "Outcome"],
        ["62.5", "Male", "Improved"],
        ["48.0", "Female", "Stable"],
        ["71.2", "Male", "Improved"],
        ["55.9", "Female", "Worsened"],
    ];
    let mut runs = Vec::new();
    for (row_idx, row) in cells.iter().enumerate() {
        for (col_idx, text) in row.iter().enumerate() {
            runs.push(run(
                text,
                col_idx as f64 * 120.0,
                y_offset + row_idx as f64 * 18.0,
            ));
        }
    }
    runs
}

/// A 5-row, 5-column outcomes table; the column-count change keeps it a
/// separate candidate from an adjacent 3-column region.
fn outcomes_runs(y_offset: f64) -> Vec<TextRun> {
    let cells = [
        ["Endpoint", "Count", "Mean", "SD", "P"],
        ["GOS", "40", "24.5", "12.1", "0.03"],
        ["Survival", "38", "18.2", "9.4", "0.01"],
        ["Recurrence", "12", "6.1", "3.3", "0.04"],
        ["Mortality", "4", "1.5", "0.9", "0.2"],
    ];
    let mut runs = Vec::new();
    for (row_idx, row) in cells.iter().enumerate() {
        for (col_idx, text) in row.iter().enumerate() {
            runs.push(run(
                text,
                col_idx as f64 * 90.0,
                y_offset + row_idx as f64 * 18.0,
            ));
        }
    }
    runs
}

fn figure_operator() -> ImageOperator {
    ImageOperator {
        kind: ImageOperatorKind::ImageObject,
        data: vec![0, 64, 128, 255],
        color_space: ColorSpace::Grayscale,
        width: 2,
        height: 2,
        transform: PageTransform::scale_translate(120.0, 90.0, 40.0, 300.0),
    }
}

#[tokio::test]
async fn test_full_document_flow() {
    let client = Arc::new(ScriptedClient::healthy());
    let pipeline = ExtractionPipeline::new(client.clone());
    let pages = vec![PageContent {
        page: 1,
        text_runs: demographics_runs(0.0),
        image_operators: vec![figure_operator()],
    }];

    let result = pipeline
        .process_document(&pages, &NoCaptions, &CancelToken::new())
        .await;

    assert!(!result.cancelled);
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.figures.len(), 1);

    let table = &result.tables[0];
    assert_eq!(table.category, ClinicalDataType::PatientDemographics);
    assert_eq!(table.agent_results.len(), 2);
    assert_eq!(
        table.consensus.primary_agent.as_deref(),
        Some("demographics_reviewer")
    );
    assert!((table.consensus.consensus_confidence - 0.93).abs() < 1e-9);
    assert!(!table.requires_review);
    assert_eq!(table.consensus.merged_fields["sample_size"].value, "40");

    // No caption: the figure stays unclassified and goes to the general
    // reviewer plus the structural validator.
    let figure = &result.figures[0];
    assert_eq!(figure.category, ClinicalDataType::Unclassified);
    assert_eq!(figure.agent_results.len(), 2);
    assert_eq!(
        figure.consensus.primary_agent.as_deref(),
        Some("general_reviewer")
    );

    let stats = &result.stats;
    assert_eq!(stats.tables_processed, 1);
    assert_eq!(stats.figures_processed, 1);
    assert_eq!(stats.reviewer_calls, 4);
    assert_eq!(stats.failed_reviewer_calls, 0);
    assert!(stats.avg_consensus_confidence > 0.8);
    assert_eq!(client.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_output_order_matches_input_despite_completion_order() {
    // The first table's reviews are slow; later tables finish first but the
    // output must still lead with it.
    let client = Arc::new(ScriptedClient::slow_on("p1_table1", Duration::from_millis(80)));
    let pipeline = ExtractionPipeline::new(client);

    let mut first_page_runs = demographics_runs(0.0);
    first_page_runs.extend(outcomes_runs(400.0));
    let pages = vec![
        PageContent {
            page: 1,
            text_runs: first_page_runs,
            image_operators: vec![],
        },
        PageContent {
            page: 2,
            text_runs: demographics_runs(0.0),
            image_operators: vec![],
        },
    ];

    let result = pipeline
        .process_document(&pages, &NoCaptions, &CancelToken::new())
        .await;

    let ids: Vec<&str> = result.tables.iter().map(|t| t.table.id.as_str()).collect();
    assert_eq!(ids, vec!["p1_table1", "p1_table2", "p2_table1"]);
}

#[tokio::test]
async fn test_cancellation_retains_finalized_items() {
    let client = Arc::new(ScriptedClient::slow_on("p2_table1", Duration::from_secs(30)));
    let pipeline = ExtractionPipeline::new(client);
    let pages = vec![
        PageContent {
            page: 1,
            text_runs: demographics_runs(0.0),
            image_operators: vec![],
        },
        PageContent {
            page: 2,
            text_runs: demographics_runs(0.0),
            image_operators: vec![],
        },
    ];

    let token = CancelToken::new();
    let canceller = token.clone();
    let cancel_task = async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    };

    let (result, ()) = tokio::join!(
        pipeline.process_document(&pages, &NoCaptions, &token),
        cancel_task
    );

    assert!(result.cancelled);
    // The fast first item finalized before cancellation; the slow one's
    // partial results were discarded.
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.tables[0].table.id, "p1_table1");
}

#[tokio::test]
async fn test_all_reviewers_failing_flags_items() {
    let client = Arc::new(ScriptedClient::failing());
    let pipeline = ExtractionPipeline::new(client);
    let pages = vec![PageContent {
        page: 1,
        text_runs: demographics_runs(0.0),
        image_operators: vec![],
    }];

    let result = pipeline
        .process_document(&pages, &NoCaptions, &CancelToken::new())
        .await;

    assert_eq!(result.tables.len(), 1);
    let table = &result.tables[0];
    assert_eq!(table.consensus.primary_agent, None);
    assert_eq!(table.consensus.consensus_confidence, 0.0);
    assert!(table.requires_review);
    assert_eq!(result.stats.failed_reviewer_calls, result.stats.reviewer_calls);
    assert_eq!(result.stats.reviewer_calls, 2);
    assert_eq!(result.stats.avg_consensus_confidence, 0.0);
}

#[tokio::test]
async fn test_prose_only_page_issues_no_reviewer_calls() {
    let client = Arc::new(ScriptedClient::healthy());
    let pipeline = ExtractionPipeline::new(client.clone());
    let pages = vec![PageContent {
        page: 1,
        text_runs: vec![
            run("The study enrolled forty patients.", 0.0, 0.0),
            run("All provided informed consent.", 0.0, 14.0),
        ],
        image_operators: vec![],
    }];

    let result = pipeline
        .process_document(&pages, &NoCaptions, &CancelToken::new())
        .await;

    assert!(result.tables.is_empty());
    assert!(result.figures.is_empty());
    assert_eq!(result.stats.reviewer_calls, 0);
    assert_eq!(result.stats.avg_consensus_confidence, 0.0);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

/// Captions feed classification: a demographics caption routes the figure to
/// the demographics reviewer.
struct FixedCaption(&'static str);

impl clinex_pipeline::CaptionSource for FixedCaption {
    fn caption_for(
        &self,
        _figure: &clinex_core::types::ExtractedFigure,
    ) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[tokio::test]
async fn test_figure_caption_drives_classification() {
    let client = Arc::new(ScriptedClient::healthy());
    let pipeline = ExtractionPipeline::new(client);
    let pages = vec![PageContent {
        page: 4,
        text_runs: vec![],
        image_operators: vec![figure_operator()],
    }];

    let captions = FixedCaption("Baseline age and sex distribution of the cohort");
    let result = pipeline
        .process_document(&pages, &captions, &CancelToken::new())
        .await;

    assert_eq!(result.figures.len(), 1);
    let figure = &result.figures[0];
    assert_eq!(figure.category, ClinicalDataType::PatientDemographics);
    assert_eq!(figure.caption.as_deref(), Some("Baseline age and sex distribution of the cohort"));
    assert_eq!(
        figure.consensus.primary_agent.as_deref(),
        Some("demographics_reviewer")
    );
}
