//! # clinex-pipeline
//!
//! Orchestration of the full extraction pipeline: geometric detection and
//! validation per page, classification, reviewer routing and invocation, and
//! consensus merging into [`EnhancedTable`]/[`EnhancedFigure`] records plus
//! aggregate statistics.
//!
//! Geometry, validation, and classification are synchronous and never
//! suspend; reviewer calls are the only await points. Reviewers of one item
//! run concurrently and extraction of later items overlaps earlier items'
//! pending reviews, but output order always matches input order regardless
//! of completion order, so downstream export stays deterministic.

pub mod cancel;

pub use cancel::CancelToken;

use std::sync::Arc;
use std::time::Instant;

use clinex_agents::{
    build_consensus, requires_review, AgentInvoker, AgentRouter, ContentClassifier,
    InferenceClient, KeywordClassifier, ReviewItem,
};
use clinex_core::config::{ConsensusConfig, InvokerConfig, LayoutConfig};
use clinex_core::types::{
    EnhancedFigure, EnhancedTable, ExtractedFigure, ExtractedTable, ImageOperator, PipelineStats,
    TextRun,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One page's upstream geometry feed.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// 1-based page number
    pub page: u32,
    pub text_runs: Vec<TextRun>,
    pub image_operators: Vec<ImageOperator>,
}

/// External caption-detection collaborator.
///
/// Figures have no intrinsic text; when a caption is available it feeds the
/// classifier and the reviewer prompts.
pub trait CaptionSource: Send + Sync {
    fn caption_for(&self, figure: &ExtractedFigure) -> Option<String>;
}

/// The no-captions default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaptions;

impl CaptionSource for NoCaptions {
    fn caption_for(&self, _figure: &ExtractedFigure) -> Option<String> {
        None
    }
}

/// Geometric extraction output for one page, before review.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    pub tables: Vec<ExtractedTable>,
    pub figures: Vec<ExtractedFigure>,
}

/// Final pipeline output for one document batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Enhanced tables, in input order
    pub tables: Vec<EnhancedTable>,
    /// Enhanced figures, in input order
    pub figures: Vec<EnhancedFigure>,
    /// True when the batch was cancelled before completion
    pub cancelled: bool,
    pub stats: PipelineStats,
}

enum PendingItem {
    Table(ExtractedTable),
    Figure(ExtractedFigure, Option<String>),
}

enum DoneItem {
    Table(EnhancedTable),
    Figure(EnhancedFigure),
}

/// The assembled extraction pipeline.
///
/// Collaborators are injected: the inference client (usually wrapped in the
/// circuit breaker), the routing table, and the classification strategy are
/// all read-only values owned by the caller.
pub struct ExtractionPipeline {
    layout: LayoutConfig,
    classifier: Arc<dyn ContentClassifier>,
    router: Arc<AgentRouter>,
    invoker: AgentInvoker,
    consensus: ConsensusConfig,
    max_in_flight_items: usize,
}

impl ExtractionPipeline {
    /// Build a pipeline with default configuration around an inference
    /// client.
    #[must_use]
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            layout: LayoutConfig::default(),
            classifier: Arc::new(KeywordClassifier::default()),
            router: Arc::new(AgentRouter::standard()),
            invoker: AgentInvoker::new(client, InvokerConfig::default()),
            consensus: ConsensusConfig::default(),
            max_in_flight_items: 4,
        }
    }

    /// Override the geometric extraction thresholds.
    #[must_use]
    pub fn with_layout_config(mut self, config: LayoutConfig) -> Self {
        self.layout = config;
        self
    }

    /// Swap the classification strategy.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Inject a custom routing table.
    #[must_use]
    pub fn with_router(mut self, router: Arc<AgentRouter>) -> Self {
        self.router = router;
        self
    }

    /// Replace the invoker, e.g. to share a process-wide limiter.
    #[must_use]
    pub fn with_invoker(mut self, invoker: AgentInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Override the consensus weighting and review threshold.
    #[must_use]
    pub fn with_consensus_config(mut self, config: ConsensusConfig) -> Self {
        self.consensus = config;
        self
    }

    /// How many items may be under review at once.
    #[must_use]
    pub fn with_max_in_flight_items(mut self, n: usize) -> Self {
        self.max_in_flight_items = n.max(1);
        self
    }

    /// Synchronous geometric extraction for one page.
    #[must_use]
    pub fn extract_page(
        &self,
        page: u32,
        text_runs: &[TextRun],
        image_operators: &[ImageOperator],
    ) -> PageGeometry {
        PageGeometry {
            tables: clinex_layout::detect_tables(page, text_runs, &self.layout),
            figures: clinex_layout::extract_figures(page, image_operators, &self.layout),
        }
    }

    /// Classify, route, review, and merge one table.
    pub async fn enhance_table(&self, table: ExtractedTable) -> EnhancedTable {
        let item = ReviewItem::from_table(&table);
        let classification = self.classifier.classify(&item);
        let agents = self.router.route(classification.category);
        let agent_results = self
            .invoker
            .review_item(&item, classification.category, &agents)
            .await;
        let consensus = build_consensus(&agent_results, &self.consensus);
        let flagged = requires_review(&consensus, &self.consensus);
        EnhancedTable {
            table,
            category: classification.category,
            classification_confidence: classification.confidence,
            agent_results,
            consensus,
            requires_review: flagged,
        }
    }

    /// Classify, route, review, and merge one figure.
    pub async fn enhance_figure(
        &self,
        figure: ExtractedFigure,
        caption: Option<String>,
    ) -> EnhancedFigure {
        let item = ReviewItem::from_figure(&figure, caption.as_deref());
        let classification = self.classifier.classify(&item);
        let agents = self.router.route(classification.category);
        let agent_results = self
            .invoker
            .review_item(&item, classification.category, &agents)
            .await;
        let consensus = build_consensus(&agent_results, &self.consensus);
        let flagged = requires_review(&consensus, &self.consensus);
        EnhancedFigure {
            figure,
            caption,
            category: classification.category,
            classification_confidence: classification.confidence,
            agent_results,
            consensus,
            requires_review: flagged,
        }
    }

    /// Run the full pipeline over a document batch.
    ///
    /// Pages are extracted synchronously in order; items then flow through
    /// review with up to `max_in_flight_items` under review at once. Output
    /// order matches extraction order. Cancelling the token abandons
    /// in-flight reviews and returns the items finalized so far.
    pub async fn process_document(
        &self,
        pages: &[PageContent],
        captions: &dyn CaptionSource,
        cancel: &CancelToken,
    ) -> DocumentResult {
        let start = Instant::now();

        let mut pending = Vec::new();
        for page in pages {
            let geometry = self.extract_page(page.page, &page.text_runs, &page.image_operators);
            info!(
                page = page.page,
                tables = geometry.tables.len(),
                figures = geometry.figures.len(),
                "page extracted"
            );
            for table in geometry.tables {
                pending.push(PendingItem::Table(table));
            }
            for figure in geometry.figures {
                let caption = captions.caption_for(&figure);
                pending.push(PendingItem::Figure(figure, caption));
            }
        }

        let mut stream = futures::stream::iter(pending.into_iter().map(|item| async move {
            match item {
                PendingItem::Table(table) => DoneItem::Table(self.enhance_table(table).await),
                PendingItem::Figure(figure, caption) => {
                    DoneItem::Figure(self.enhance_figure(figure, caption).await)
                }
            }
        }))
        .buffered(self.max_in_flight_items);

        let mut tables = Vec::new();
        let mut figures = Vec::new();
        let mut cancelled = false;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    warn!("batch cancelled, abandoning in-flight reviews");
                    cancelled = true;
                    break;
                }
                next = stream.next() => match next {
                    Some(DoneItem::Table(table)) => tables.push(table),
                    Some(DoneItem::Figure(figure)) => figures.push(figure),
                    None => break,
                },
            }
        }
        drop(stream);

        let stats = collect_stats(&tables, &figures, start.elapsed().as_millis() as u64);
        info!(
            tables = stats.tables_processed,
            figures = stats.figures_processed,
            failed_reviewers = stats.failed_reviewer_calls,
            avg_confidence = stats.avg_consensus_confidence,
            cancelled,
            "document batch finished"
        );

        DocumentResult {
            tables,
            figures,
            cancelled,
            stats,
        }
    }
}

fn collect_stats(
    tables: &[EnhancedTable],
    figures: &[EnhancedFigure],
    elapsed_ms: u64,
) -> PipelineStats {
    let reviewer_calls = tables
        .iter()
        .map(|t| t.agent_results.len())
        .chain(figures.iter().map(|f| f.agent_results.len()))
        .sum();
    let failed_reviewer_calls = tables
        .iter()
        .flat_map(|t| &t.agent_results)
        .chain(figures.iter().flat_map(|f| &f.agent_results))
        .filter(|r| !r.is_validated())
        .count();

    let confidences: Vec<f64> = tables
        .iter()
        .map(|t| t.consensus.consensus_confidence)
        .chain(figures.iter().map(|f| f.consensus.consensus_confidence))
        .collect();
    let avg_consensus_confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    PipelineStats {
        tables_processed: tables.len(),
        figures_processed: figures.len(),
        reviewer_calls,
        failed_reviewer_calls,
        avg_consensus_confidence,
        elapsed_ms,
    }
}
