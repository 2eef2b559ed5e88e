//! Pipeline driver: acquire → locate → extract across an ordered target list.
//!
//! Targets run strictly in sequence through one rendering session. Every
//! target ends in either [`TargetState::Done`] or [`TargetState::Skipped`];
//! per-target failures are recorded in its [`TargetOutcome`] and never abort
//! the run. Only failure to open the session is fatal.

use crate::acquire::{AcquireConfig, RenderAcquirer, RenderedDocument};
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::{FieldExtractor, PageHarvest};
use crate::locate::locate;
use crate::pacing::{pause, IdentityPool, PacingConfig, PacingPolicy, RandomPacing};
use crate::renderer::Renderer;
use crate::types::{PageKind, Record, Target};
use scraper::Html;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const BANNER: &str = "==================================================";

/// Progress of one target through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Pending,
    Acquiring,
    Locating,
    Extracting,
    Done,
    Skipped,
}

impl TargetState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

/// Final report for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub target: Target,
    pub state: TargetState,
    /// Containers located (1 for a detail page that was reached).
    pub containers: usize,
    pub records: usize,
    pub failed_containers: usize,
    /// Why the target was skipped.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl TargetOutcome {
    fn new(target: Target) -> Self {
        Self {
            target,
            state: TargetState::Pending,
            containers: 0,
            records: 0,
            failed_containers: 0,
            error: None,
            elapsed_ms: 0,
        }
    }

    fn advance(&mut self, next: TargetState) {
        debug_assert!(!self.state.is_terminal(), "target already finished");
        tracing::debug!("{}: {:?} -> {:?}", self.target.url, self.state, next);
        self.state = next;
    }

    fn skip(&mut self, reason: String) {
        self.advance(TargetState::Skipped);
        self.error = Some(reason);
    }
}

/// Everything a run produced.
#[derive(Debug, Default, Serialize)]
pub struct Harvest {
    /// Records in target order, then container order.
    pub records: Vec<Record>,
    /// One entry per attempted target.
    pub outcomes: Vec<TargetOutcome>,
    /// Set when a stop request ended the run early.
    pub cancelled: bool,
}

impl Harvest {
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == TargetState::Skipped)
            .count()
    }
}

/// Per-run driver settings.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_products: usize,
    pub acquire: AcquireConfig,
    pub pacing: PacingConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_products: 20,
            acquire: AcquireConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

/// Sequential scrape driver.
pub struct Pipeline {
    extractor: FieldExtractor,
    options: PipelineOptions,
    policy: Arc<dyn PacingPolicy>,
    identities: Arc<IdentityPool>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(extractor: FieldExtractor, options: PipelineOptions) -> Self {
        Self {
            extractor,
            options,
            policy: Arc::new(RandomPacing),
            identities: Arc::new(IdentityPool::default()),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_pacing(mut self, policy: Arc<dyn PacingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_identities(mut self, identities: Arc<IdentityPool>) -> Self {
        self.identities = identities;
        self
    }

    /// Share a flag that, once set, stops the run before the next target.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Short randomized pause in the human pacing range.
    pub async fn human_delay(&self) {
        pause(self.policy.as_ref(), self.options.pacing.human).await;
    }

    /// Scrape `targets` in order through one session opened on `renderer`.
    pub async fn run(&self, renderer: &dyn Renderer, targets: &[Target]) -> ScrapeResult<Harvest> {
        let mut harvest = Harvest::default();
        if targets.is_empty() {
            tracing::warn!("no targets to scrape");
            if let Err(e) = renderer.shutdown().await {
                tracing::warn!("browser shutdown failed: {e}");
            }
            return Ok(harvest);
        }

        let context = match renderer.new_context(self.identities.next()).await {
            Ok(context) => context,
            Err(e) => {
                tracing::error!("failed to open rendering session: {e}");
                if let Err(e) = renderer.shutdown().await {
                    tracing::warn!("browser shutdown failed: {e}");
                }
                return Err(ScrapeError::Initialization(e));
            }
        };
        let mut acquirer = RenderAcquirer::new(
            context,
            self.options.acquire.clone(),
            Arc::clone(&self.policy),
            Arc::clone(&self.identities),
        )
        .with_human_delay(self.options.pacing.human);

        for (i, target) in targets.iter().enumerate() {
            if i > 0 && !self.stop_requested() {
                pause(self.policy.as_ref(), self.options.pacing.between_targets).await;
            }
            if self.stop_requested() {
                tracing::warn!("stop requested, {} targets not attempted", targets.len() - i);
                harvest.cancelled = true;
                break;
            }

            tracing::info!("{BANNER}");
            tracing::info!("scraping {}: {}", target.category, target.url);
            tracing::info!("{BANNER}");

            let outcome = self.run_target(&mut acquirer, target, &mut harvest.records).await;
            tracing::info!(
                "finished {}: {} records ({:?}, {}ms)",
                target.category,
                outcome.records,
                outcome.state,
                outcome.elapsed_ms
            );
            harvest.outcomes.push(outcome);
        }

        if let Err(e) = acquirer.close().await {
            tracing::warn!("failed to close page: {e}");
        }
        if let Err(e) = renderer.shutdown().await {
            tracing::warn!("browser shutdown failed: {e}");
        }

        tracing::info!(
            "total records scraped: {} ({} of {} targets skipped)",
            harvest.records.len(),
            harvest.skipped(),
            harvest.outcomes.len()
        );
        Ok(harvest)
    }

    async fn run_target(
        &self,
        acquirer: &mut RenderAcquirer,
        target: &Target,
        records: &mut Vec<Record>,
    ) -> TargetOutcome {
        let start = Instant::now();
        let mut outcome = TargetOutcome::new(target.clone());
        outcome.advance(TargetState::Acquiring);

        let ready = match target.kind {
            PageKind::Detail => self.extractor.layout().detail_ready.as_deref(),
            PageKind::Listing => None,
        };

        match acquirer.acquire(&target.url, ready).await {
            Ok(doc) => {
                let page = self.harvest_document(&doc, target.kind, &mut outcome);
                outcome.containers = page.containers;
                outcome.records = page.records.len();
                outcome.failed_containers = page.failures.len();
                records.extend(
                    page.records
                        .into_iter()
                        .map(|r| r.with_category(target.category.as_str())),
                );
                outcome.advance(TargetState::Done);
            }
            Err(e) => {
                tracing::error!("skipping {}: {e}", target.url);
                outcome.skip(e.to_string());
            }
        }

        outcome.elapsed_ms = start.elapsed().as_millis() as u64;
        outcome
    }

    /// Parse and extract a rendered page. The parsed tree stays inside this
    /// synchronous call.
    fn harvest_document(
        &self,
        doc: &RenderedDocument,
        kind: PageKind,
        outcome: &mut TargetOutcome,
    ) -> PageHarvest {
        let html = Html::parse_document(&doc.html);
        outcome.advance(TargetState::Locating);
        match kind {
            PageKind::Listing => {
                let containers = locate(
                    &html,
                    &self.extractor.layout().containers,
                    self.options.max_products,
                );
                outcome.advance(TargetState::Extracting);
                self.extractor.extract_containers(&containers, &doc.url)
            }
            PageKind::Detail => {
                outcome.advance(TargetState::Extracting);
                self.extractor.extract_document(&html, &doc.url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_state_machine() {
        let mut outcome = TargetOutcome::new(Target::listing("c", "https://a.test/"));
        assert_eq!(outcome.state, TargetState::Pending);
        outcome.advance(TargetState::Acquiring);
        outcome.skip("boom".into());
        assert_eq!(outcome.state, TargetState::Skipped);
        assert!(outcome.state.is_terminal());
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_harvest_counts_skipped() {
        let mut done = TargetOutcome::new(Target::listing("a", "https://a.test/"));
        done.state = TargetState::Done;
        let mut skipped = TargetOutcome::new(Target::listing("b", "https://b.test/"));
        skipped.state = TargetState::Skipped;
        let harvest = Harvest {
            outcomes: vec![done, skipped],
            ..Harvest::default()
        };
        assert_eq!(harvest.skipped(), 1);
    }
}
