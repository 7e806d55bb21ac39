//! Workflow state and the status document derived from it
//!
//! `WorkflowState` guards its own control fields: the revision counter only
//! moves forward and is bounded, the overall status becomes terminal at most
//! once, and nothing about the step or subsystem statuses changes after that.

use super::report::FinalReport;
use crate::llm::ProviderName;
use crate::quality::Score;
use crate::research::{DataSource, ResearchMaterial};
use crate::types::{AnalysisRequest, AppError, ProviderStatus, Result, SourceStatus};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

pub const MAX_REVISIONS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Input,
    Cache,
    Researcher,
    Analyzer,
    Critic,
    Editor,
    Output,
    Completed,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Input => "input",
            Step::Cache => "cache",
            Step::Researcher => "researcher",
            Step::Analyzer => "analyzer",
            Step::Critic => "critic",
            Step::Editor => "editor",
            Step::Output => "output",
            Step::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Starting,
    Running,
    Completed,
    Error,
    Aborted,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Error | WorkflowStatus::Aborted
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Starting => "starting",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Error => "error",
            WorkflowStatus::Aborted => "aborted",
        }
    }
}

// ============= Fixed Status Maps =============

/// A member of a closed key set
pub trait Slot: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn key(&self) -> &'static str;
}

impl Slot for DataSource {
    const ALL: &'static [Self] = &DataSource::ALL;

    fn key(&self) -> &'static str {
        self.as_str()
    }
}

impl Slot for ProviderName {
    const ALL: &'static [Self] = &ProviderName::ALL;

    fn key(&self) -> &'static str {
        self.as_str()
    }
}

/// One value per member of `K`, always complete, serialized as a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMap<K: Slot, V> {
    entries: Vec<(K, V)>,
}

impl<K: Slot, V: Copy + Default + PartialEq> Default for StatusMap<K, V> {
    fn default() -> Self {
        Self {
            entries: K::ALL.iter().map(|k| (*k, V::default())).collect(),
        }
    }
}

impl<K: Slot, V: Copy + Default + PartialEq> StatusMap<K, V> {
    pub fn get(&self, key: K) -> V {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: K, value: V) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.entries.iter().copied()
    }

    /// Replace every `from` value with `to`
    pub fn replace_all(&mut self, from: V, to: V) {
        for entry in &mut self.entries {
            if entry.1 == from {
                entry.1 = to;
            }
        }
    }
}

impl<K: Slot, V: Serialize> Serialize for StatusMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k.key(), v)?;
        }
        map.end()
    }
}

// ============= Telemetry Entries =============

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub step: Step,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetricEntry {
    pub timestamp: DateTime<Utc>,
    pub source: DataSource,
    pub metric: String,
    #[schema(value_type = Object)]
    pub value: Value,
}

// ============= Workflow State =============

#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub workflow_id: String,

    // identity
    pub company: String,
    pub ticker: Option<String>,
    pub strategy_focus: String,

    // content
    pub material: Option<ResearchMaterial>,
    pub draft: Option<String>,
    pub critique: Option<String>,
    score: Option<Score>,

    // control
    revision_count: u8,
    current_step: Step,
    status: WorkflowStatus,

    // telemetry
    pub activity_log: Vec<LogEntry>,
    pub metrics: Vec<MetricEntry>,
    mcp_status: StatusMap<DataSource, SourceStatus>,
    llm_status: StatusMap<ProviderName, ProviderStatus>,

    pub error: Option<String>,
    pub provider_used: Option<String>,
    pub cached: bool,
    pub report: Option<FinalReport>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// `request` is expected to be normalized already
    pub fn new(workflow_id: impl Into<String>, request: &AnalysisRequest) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            company: request.company.clone(),
            ticker: request.ticker.clone(),
            strategy_focus: request.focus().to_string(),
            material: None,
            draft: None,
            critique: None,
            score: None,
            revision_count: 0,
            current_step: Step::Input,
            status: WorkflowStatus::Starting,
            activity_log: Vec::new(),
            metrics: Vec::new(),
            mcp_status: StatusMap::default(),
            llm_status: StatusMap::default(),
            error: None,
            provider_used: None,
            cached: false,
            report: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn revision_count(&self) -> u8 {
        self.revision_count
    }

    pub fn score(&self) -> Option<Score> {
        self.score
    }

    pub fn mcp_status(&self) -> &StatusMap<DataSource, SourceStatus> {
        &self.mcp_status
    }

    pub fn llm_status(&self) -> &StatusMap<ProviderName, ProviderStatus> {
        &self.llm_status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn request(&self) -> AnalysisRequest {
        AnalysisRequest {
            company: self.company.clone(),
            ticker: self.ticker.clone(),
            strategy_focus: Some(self.strategy_focus.clone()),
        }
    }

    /// Move to `step`, marking the workflow running
    pub fn enter(&mut self, step: Step) -> Result<()> {
        self.ensure_live()?;
        self.current_step = step;
        self.status = WorkflowStatus::Running;
        Ok(())
    }

    /// Count one more revision. Fails once the budget is spent.
    pub fn increment_revision(&mut self, max: u8) -> Result<u8> {
        self.ensure_live()?;
        let max = max.min(MAX_REVISIONS);
        if self.revision_count >= max {
            return Err(AppError::Internal(format!(
                "revision budget of {} already spent",
                max
            )));
        }
        self.revision_count += 1;
        Ok(self.revision_count)
    }

    /// Adopt the revision count of a cached result. Never lowers the count.
    pub fn restore_revisions(&mut self, count: u8) {
        if !self.is_terminal() {
            self.revision_count = self.revision_count.max(count.min(MAX_REVISIONS));
        }
    }

    pub fn set_score(&mut self, score: Score) {
        if !self.is_terminal() {
            self.score = Some(score);
        }
    }

    pub fn set_source_status(&mut self, source: DataSource, status: SourceStatus) {
        if !self.is_terminal() {
            self.mcp_status.set(source, status);
        }
    }

    pub fn set_provider_status(&mut self, provider: ProviderName, status: ProviderStatus) {
        if !self.is_terminal() {
            self.llm_status.set(provider, status);
        }
    }

    pub fn log(&mut self, step: Step, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.activity_log.push(LogEntry {
            timestamp: Utc::now(),
            step,
            message: message.into(),
        });
    }

    pub fn record_metric(&mut self, source: DataSource, metric: &str, value: &Value) {
        if self.is_terminal() {
            return;
        }
        self.metrics.push(MetricEntry {
            timestamp: Utc::now(),
            source,
            metric: metric.to_string(),
            value: value.clone(),
        });
    }

    /// Terminal success, once the output step has stored the report.
    /// Returns false if the workflow was already terminal.
    pub fn complete(&mut self) -> bool {
        if self.is_terminal() || self.report.is_none() {
            return false;
        }
        self.log(Step::Completed, "Workflow completed");
        self.current_step = Step::Completed;
        self.status = WorkflowStatus::Completed;
        true
    }

    /// Terminal failure of the active step
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let message = message.into();
        let step = self.current_step;
        self.log(step, format!("Failed: {}", message));
        self.settle_executing();
        self.error = Some(message);
        self.status = WorkflowStatus::Error;
        true
    }

    /// Terminal cancellation. The current step stays where it was and no
    /// subsystem is left marked executing.
    pub fn abort(&mut self, reason: Option<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let step = self.current_step;
        self.log(step, "Workflow aborted");
        self.settle_executing();
        self.error = reason;
        self.status = WorkflowStatus::Aborted;
        true
    }

    fn settle_executing(&mut self) {
        self.mcp_status
            .replace_all(SourceStatus::Executing, SourceStatus::Idle);
        self.llm_status
            .replace_all(ProviderStatus::Executing, ProviderStatus::Idle);
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(AppError::Internal(format!(
                "workflow {} is already {}",
                self.workflow_id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn status_document(&self) -> StatusDocument {
        StatusDocument {
            workflow_id: self.workflow_id.clone(),
            company: self.company.clone(),
            ticker: self.ticker.clone(),
            strategy_focus: self.strategy_focus.clone(),
            status: self.status,
            current_step: self.current_step,
            revision_count: self.revision_count,
            score: self.score.map(|s| s.value()),
            activity_log: self.activity_log.clone(),
            metrics: self.metrics.clone(),
            mcp_status: self.mcp_status.clone(),
            llm_status: self.llm_status.clone(),
            provider_used: self.provider_used.clone(),
            cached: self.cached,
            error: self.error.clone(),
        }
    }
}

/// What status-polling callers see
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusDocument {
    pub workflow_id: String,
    pub company: String,
    pub ticker: Option<String>,
    pub strategy_focus: String,
    pub status: WorkflowStatus,
    pub current_step: Step,
    pub revision_count: u8,
    /// Absent until the critic has run
    pub score: Option<u8>,
    pub activity_log: Vec<LogEntry>,
    pub metrics: Vec<MetricEntry>,
    #[schema(value_type = Object)]
    pub mcp_status: StatusMap<DataSource, SourceStatus>,
    #[schema(value_type = Object)]
    pub llm_status: StatusMap<ProviderName, ProviderStatus>,
    pub provider_used: Option<String>,
    pub cached: bool,
    pub error: Option<String>,
}
