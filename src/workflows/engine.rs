//! Workflow Engine
//!
//! Drives one analysis through a fixed step machine:
//!
//! ```text
//! input -> cache -(hit)--------------------------------> output -> completed
//!            \-(miss)-> researcher -> analyzer -> critic -/
//!                                                 ^    |
//!                                                 |    v (below threshold, budget left)
//!                                                editor
//! ```
//!
//! The transition table is the pure function [`next_step`]. [`WorkflowEngine::run`]
//! executes one step at a time, applies its result to the [`StateCell`] and
//! checks for abort at every step boundary. A step in progress is raced
//! against the abort signal, so an abort never waits on a slow provider.

use super::cache::{AnalysisCache, CacheClaim, CacheKey, CachedAnalysis, Lookup};
use super::prompts::{analyzer_prompt, editor_prompt, ANALYZER_SYSTEM, EDITOR_SYSTEM};
use super::report::{FinalReport, ReportInput};
use super::state::{Step, WorkflowState, MAX_REVISIONS};
use super::store::WorkflowStore;
use crate::a2a::{RemoteResearch, TaskRequest};
use crate::llm::{ProviderName, ProviderRouter};
use crate::quality::{QualityGate, Score};
use crate::research::{DataAggregator, DataSource, ResearchMaterial};
use crate::telemetry::ProgressSink;
use crate::types::{AnalysisRequest, AppError, ProviderStatus, Result, SourceStatus};
use crate::utils::toml_config::QualityConfig;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

// ============= Transition Table =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopPolicy {
    pub pass_threshold: u8,
    pub max_revisions: u8,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: 7,
            max_revisions: MAX_REVISIONS,
        }
    }
}

impl From<&QualityConfig> for LoopPolicy {
    fn from(config: &QualityConfig) -> Self {
        Self {
            pass_threshold: config.pass_threshold,
            max_revisions: config.max_revisions.min(MAX_REVISIONS),
        }
    }
}

/// What a finished step reports back to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    CacheHit,
    CacheMiss,
    Scored(Score),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: Step,
    /// Count one revision before dispatching `to`
    pub revise: bool,
}

impl Transition {
    fn to(step: Step) -> Self {
        Self {
            to: step,
            revise: false,
        }
    }
}

pub fn next_step(
    from: Step,
    outcome: StepOutcome,
    revision_count: u8,
    policy: &LoopPolicy,
) -> Result<Transition> {
    let transition = match (from, outcome) {
        (Step::Input, StepOutcome::Done) => Transition::to(Step::Cache),
        (Step::Cache, StepOutcome::CacheHit) => Transition::to(Step::Output),
        (Step::Cache, StepOutcome::CacheMiss) => Transition::to(Step::Researcher),
        (Step::Researcher, StepOutcome::Done) => Transition::to(Step::Analyzer),
        (Step::Analyzer, StepOutcome::Done) => Transition::to(Step::Critic),
        (Step::Critic, StepOutcome::Scored(score)) => {
            if score.passes(policy.pass_threshold) || revision_count >= policy.max_revisions {
                Transition::to(Step::Output)
            } else {
                Transition {
                    to: Step::Editor,
                    revise: true,
                }
            }
        }
        (Step::Editor, StepOutcome::Done) => Transition::to(Step::Critic),
        (Step::Output, StepOutcome::Done) => Transition::to(Step::Completed),
        (from, outcome) => {
            return Err(AppError::Internal(format!(
                "no transition from {} on {:?}",
                from, outcome
            )))
        }
    };
    Ok(transition)
}

// ============= Abort Signal =============

/// Sending half of a workflow's abort signal
pub struct AbortController(watch::Sender<bool>);

#[derive(Clone)]
pub struct AbortSignal(watch::Receiver<bool>);

impl AbortController {
    pub fn channel() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self(tx), AbortSignal(rx))
    }

    pub fn abort(&self) {
        self.0.send_replace(true);
    }
}

impl AbortSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        AbortSignal(rx)
    }

    pub fn is_aborted(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once abort is requested. Pending forever if the controller
    /// is gone without aborting.
    pub async fn aborted(&mut self) {
        if self.0.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ============= State Cell =============

/// The one place a running workflow's state lives. Every mutation is
/// followed by a snapshot save.
pub struct StateCell {
    state: Mutex<WorkflowState>,
    store: Arc<dyn WorkflowStore>,
}

impl StateCell {
    pub fn new(state: WorkflowState, store: Arc<dyn WorkflowStore>) -> Self {
        store.save(&state.workflow_id, state.clone());
        Self {
            state: Mutex::new(state),
            store,
        }
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut WorkflowState) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state);
        state.updated_at = chrono::Utc::now();
        self.store.save(&state.workflow_id, state.clone());
        out
    }

    pub fn read<R>(&self, f: impl FnOnce(&WorkflowState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.state.lock().clone()
    }

    pub fn log(&self, step: Step, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.log(step, message));
    }

    /// Progress sink that attributes log lines to `step`
    pub fn sink(&self, step: Step) -> StepSink<'_> {
        StepSink { cell: self, step }
    }
}

pub struct StepSink<'a> {
    cell: &'a StateCell,
    step: Step,
}

impl ProgressSink for StepSink<'_> {
    fn log(&self, message: &str) {
        self.cell.log(self.step, message);
    }

    fn provider_status(&self, provider: ProviderName, status: ProviderStatus) {
        self.cell.update(|s| s.set_provider_status(provider, status));
    }

    fn source_status(&self, source: DataSource, status: SourceStatus) {
        self.cell.update(|s| s.set_source_status(source, status));
    }

    fn metric(&self, source: DataSource, name: &str, value: &Value) {
        self.cell.update(|s| s.record_metric(source, name, value));
    }
}

// ============= Engine =============

/// Per-run scratch space that does not belong in the state document
struct RunScratch {
    key: CacheKey,
    claim: Option<CacheClaim>,
    cached: Option<Arc<CachedAnalysis>>,
}

pub struct WorkflowEngine {
    router: Arc<ProviderRouter>,
    aggregator: Arc<DataAggregator>,
    gate: QualityGate,
    remote: Option<Arc<RemoteResearch>>,
    cache: Option<Arc<AnalysisCache>>,
    policy: LoopPolicy,
}

impl WorkflowEngine {
    pub fn new(router: Arc<ProviderRouter>, aggregator: Arc<DataAggregator>, quality: QualityConfig) -> Self {
        let policy = LoopPolicy::from(&quality);
        Self {
            gate: QualityGate::new(router.clone(), quality),
            router,
            aggregator,
            remote: None,
            cache: None,
            policy,
        }
    }

    /// Delegate research to a remote executor, falling back locally per request
    pub fn with_remote(mut self, remote: Arc<RemoteResearch>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> &LoopPolicy {
        &self.policy
    }

    pub fn cache(&self) -> Option<&Arc<AnalysisCache>> {
        self.cache.as_ref()
    }

    pub fn is_delegated(&self) -> bool {
        self.remote.is_some()
    }

    /// Run the workflow in `cell` to a terminal status
    pub async fn run(&self, cell: &StateCell, mut abort: AbortSignal) {
        let request = cell.read(WorkflowState::request);
        let workflow_id = cell.read(|s| s.workflow_id.clone());
        let span = tracing::info_span!("workflow", workflow_id = %workflow_id);

        async {
            let mut scratch = RunScratch {
                key: CacheKey::for_request(&request),
                claim: None,
                cached: None,
            };
            let mut step = Step::Input;
            info!(company = %request.company, "Workflow started");

            loop {
                if abort.is_aborted() {
                    cell.update(|s| s.abort(None));
                    info!(step = %step, "Workflow aborted");
                    return;
                }

                if let Err(e) = cell.update(|s| s.enter(step)) {
                    warn!("Stopping: {}", e);
                    return;
                }

                if step == Step::Completed {
                    if !cell.update(WorkflowState::complete) {
                        cell.update(|s| s.fail("output step produced no report"));
                        error!("Workflow reached completion without a report");
                        return;
                    }
                    info!("Workflow completed");
                    return;
                }

                let outcome = tokio::select! {
                    biased;
                    _ = abort.aborted() => {
                        cell.update(|s| s.abort(None));
                        info!(step = %step, "Workflow aborted mid-step");
                        return;
                    }
                    outcome = self.execute(step, cell, &request, &mut scratch) => outcome,
                };

                let revisions = cell.read(WorkflowState::revision_count);
                let transition = outcome.and_then(|o| next_step(step, o, revisions, &self.policy));
                let transition = match transition {
                    Ok(t) => t,
                    Err(e) => {
                        error!(step = %step, "Step failed: {}", e);
                        cell.update(|s| s.fail(e.to_string()));
                        return;
                    }
                };

                if transition.revise {
                    let max = self.policy.max_revisions;
                    match cell.update(|s| s.increment_revision(max)) {
                        Ok(n) => info!(revision = n, "Draft below threshold, revising"),
                        Err(e) => {
                            error!("Revision guard tripped: {}", e);
                            cell.update(|s| s.fail(e.to_string()));
                            return;
                        }
                    }
                }
                step = transition.to;
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        step: Step,
        cell: &StateCell,
        request: &AnalysisRequest,
        scratch: &mut RunScratch,
    ) -> Result<StepOutcome> {
        match step {
            Step::Input => {
                cell.log(
                    step,
                    format!(
                        "Analysis requested for {} ({}), focus: {}",
                        request.company,
                        request.ticker.as_deref().unwrap_or("no ticker"),
                        request.focus()
                    ),
                );
                Ok(StepOutcome::Done)
            }
            Step::Cache => Ok(self.check_cache(cell, scratch).await),
            Step::Researcher => {
                let sink = cell.sink(step);
                let material = self.research(request, &sink).await?;
                let usable = material.usable_sources().len();
                let total = material.reports.len();
                cell.update(|s| {
                    s.log(step, format!("Research completed: {}/{} sources usable", usable, total));
                    s.material = Some(material);
                });
                Ok(StepOutcome::Done)
            }
            Step::Analyzer => {
                let material = required(cell, |s| s.material.clone(), "research material")?;
                let sink = cell.sink(step);
                sink.log("Generating SWOT draft");
                let prompt = analyzer_prompt(&material, request.focus());
                let routed = self.router.generate(ANALYZER_SYSTEM, &prompt, &sink).await?;
                cell.update(|s| {
                    s.draft = Some(routed.value);
                    s.provider_used = Some(routed.provider_used);
                });
                Ok(StepOutcome::Done)
            }
            Step::Critic => {
                let material = required(cell, |s| s.material.clone(), "research material")?;
                let draft = required(cell, |s| s.draft.clone(), "draft")?;
                let sink = cell.sink(step);
                let evaluation = self
                    .gate
                    .evaluate(&draft, request.focus(), &material, &sink)
                    .await?;
                let score = evaluation.score;
                cell.update(|s| {
                    s.set_score(score);
                    s.critique = Some(evaluation.critique);
                    s.log(
                        step,
                        format!("Score {} after {} revision(s)", score, s.revision_count()),
                    );
                });
                Ok(StepOutcome::Scored(score))
            }
            Step::Editor => {
                let material = required(cell, |s| s.material.clone(), "research material")?;
                let draft = required(cell, |s| s.draft.clone(), "draft")?;
                let critique = required(cell, |s| s.critique.clone(), "critique")?;
                let sink = cell.sink(step);
                sink.log(&format!(
                    "Revision #{} in progress",
                    cell.read(WorkflowState::revision_count)
                ));
                let prompt = editor_prompt(&material, &draft, &critique, request.focus());
                let routed = self.router.generate(EDITOR_SYSTEM, &prompt, &sink).await?;
                cell.update(|s| {
                    s.draft = Some(routed.value);
                    s.provider_used = Some(routed.provider_used);
                });
                Ok(StepOutcome::Done)
            }
            Step::Output => {
                self.finalize(cell, scratch)?;
                Ok(StepOutcome::Done)
            }
            Step::Completed => Err(AppError::Internal("completed is not an executable step".into())),
        }
    }

    async fn check_cache(&self, cell: &StateCell, scratch: &mut RunScratch) -> StepOutcome {
        let Some(cache) = &self.cache else {
            cell.log(Step::Cache, "Cache disabled");
            return StepOutcome::CacheMiss;
        };

        match cache.lookup(&scratch.key).await {
            Lookup::Hit(entry) => {
                info!("Cache hit");
                cell.log(Step::Cache, "Cache hit: reusing previous analysis");
                scratch.cached = Some(entry);
                StepOutcome::CacheHit
            }
            Lookup::Miss(claim) => {
                cell.log(Step::Cache, "Cache miss");
                scratch.claim = claim;
                StepOutcome::CacheMiss
            }
        }
    }

    async fn research(&self, request: &AnalysisRequest, sink: &StepSink<'_>) -> Result<ResearchMaterial> {
        let company = request.company.as_str();
        let ticker = request.ticker.as_deref();

        let Some(remote) = &self.remote else {
            return self.aggregator.gather_sequential(company, ticker, sink).await;
        };

        let task = TaskRequest {
            company: request.company.clone(),
            ticker: request.ticker.clone(),
            strategy_focus: request.strategy_focus.clone(),
        };

        let reports = match remote.run(&task, sink).await {
            Ok(material) => material.reports,
            Err(failure) => {
                let outstanding = failure.outstanding();
                warn!(
                    reason = %failure.reason,
                    received = failure.partial.len(),
                    "Delegated research failed, continuing locally"
                );
                sink.log(&format!(
                    "Delegation failed ({}); gathering {} remaining source(s) locally",
                    failure.reason,
                    outstanding.len()
                ));
                let mut reports = failure.partial;
                reports.extend(
                    self.aggregator
                        .collect_sequential(&outstanding, company, ticker, sink)
                        .await,
                );
                reports
            }
        };

        // Delegation marks every source executing up front; release the ones
        // nobody reported on.
        for source in DataSource::ALL {
            if !reports.iter().any(|r| r.source == source) {
                sink.source_status(source, SourceStatus::Idle);
            }
        }

        ResearchMaterial::new(company, request.ticker.clone(), reports).ensure_usable()
    }

    fn finalize(&self, cell: &StateCell, scratch: &mut RunScratch) -> Result<()> {
        let threshold = self.policy.pass_threshold;

        if let Some(entry) = scratch.cached.take() {
            cell.update(|s| {
                s.material = Some(entry.material.clone());
                s.draft = Some(entry.draft.clone());
                s.critique = Some(entry.critique.clone());
                s.set_score(entry.score);
                s.restore_revisions(entry.revision_count);
                s.provider_used = entry.provider_used.clone();
                s.cached = true;
                let report = FinalReport::build(ReportInput {
                    material: &entry.material,
                    strategy_focus: &s.strategy_focus,
                    draft: &entry.draft,
                    critique: &entry.critique,
                    score: entry.score,
                    revision_count: s.revision_count(),
                    provider_used: entry.provider_used.clone(),
                    pass_threshold: threshold,
                    cached: true,
                });
                s.log(Step::Output, "Report served from cache");
                s.report = Some(report);
            });
            return Ok(());
        }

        let entry = cell.read(|s| -> Result<CachedAnalysis> {
            Ok(CachedAnalysis {
                material: s
                    .material
                    .clone()
                    .ok_or_else(|| missing("research material"))?,
                draft: s.draft.clone().ok_or_else(|| missing("draft"))?,
                critique: s.critique.clone().ok_or_else(|| missing("critique"))?,
                score: s.score().ok_or_else(|| missing("score"))?,
                revision_count: s.revision_count(),
                provider_used: s.provider_used.clone(),
            })
        })?;

        cell.update(|s| {
            let report = FinalReport::build(ReportInput {
                material: &entry.material,
                strategy_focus: &s.strategy_focus,
                draft: &entry.draft,
                critique: &entry.critique,
                score: entry.score,
                revision_count: entry.revision_count,
                provider_used: entry.provider_used.clone(),
                pass_threshold: threshold,
                cached: false,
            });
            let verdict = if report.meets_quality_bar {
                "meets the quality bar"
            } else {
                "below the quality bar, revision budget exhausted"
            };
            s.log(
                Step::Output,
                format!("Report finalized at {}: {}", entry.score, verdict),
            );
            s.report = Some(report);
        });

        if let Some(claim) = scratch.claim.take() {
            claim.publish(entry);
        }
        Ok(())
    }
}

fn missing(what: &str) -> AppError {
    AppError::Internal(format!("{} is missing", what))
}

fn required<T>(
    cell: &StateCell,
    get: impl FnOnce(&WorkflowState) -> Option<T>,
    what: &str,
) -> Result<T> {
    cell.read(get).ok_or_else(|| missing(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> LoopPolicy {
        LoopPolicy::default()
    }

    #[rstest]
    #[case(Step::Input, StepOutcome::Done, Step::Cache)]
    #[case(Step::Cache, StepOutcome::CacheHit, Step::Output)]
    #[case(Step::Cache, StepOutcome::CacheMiss, Step::Researcher)]
    #[case(Step::Researcher, StepOutcome::Done, Step::Analyzer)]
    #[case(Step::Analyzer, StepOutcome::Done, Step::Critic)]
    #[case(Step::Editor, StepOutcome::Done, Step::Critic)]
    #[case(Step::Output, StepOutcome::Done, Step::Completed)]
    fn fixed_transitions(#[case] from: Step, #[case] outcome: StepOutcome, #[case] to: Step) {
        let t = next_step(from, outcome, 0, &policy()).unwrap();
        assert_eq!(t.to, to);
        assert!(!t.revise);
    }

    #[rstest]
    #[case(7, 0, Step::Output, false)]
    #[case(6, 0, Step::Editor, true)]
    #[case(6, 2, Step::Editor, true)]
    #[case(6, 3, Step::Output, false)]
    #[case(10, 3, Step::Output, false)]
    fn critic_exit_condition(
        #[case] score: u8,
        #[case] revisions: u8,
        #[case] to: Step,
        #[case] revise: bool,
    ) {
        let t = next_step(Step::Critic, StepOutcome::Scored(Score::new(score)), revisions, &policy())
            .unwrap();
        assert_eq!(t, Transition { to, revise });
    }

    #[test]
    fn mismatched_outcome_is_an_internal_error() {
        let err = next_step(Step::Critic, StepOutcome::Done, 0, &policy()).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(next_step(Step::Completed, StepOutcome::Done, 0, &policy()).is_err());
    }

    #[test]
    fn configured_budget_is_capped() {
        let config = QualityConfig {
            max_revisions: 9,
            ..QualityConfig::default()
        };
        assert_eq!(LoopPolicy::from(&config).max_revisions, MAX_REVISIONS);
    }

    #[tokio::test]
    async fn abort_signal_fires_once_requested() {
        let (controller, mut signal) = AbortController::channel();
        assert!(!signal.is_aborted());
        controller.abort();
        signal.aborted().await;
        assert!(signal.is_aborted());
        assert!(!AbortSignal::never().is_aborted());
    }
}
