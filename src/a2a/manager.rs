//! Server side of the research protocol: task bookkeeping and execution
//!
//! A submitted task runs the concurrent gather on the tokio runtime. Its
//! lifecycle is `submitted -> working -> completed | failed`, with `cancelled`
//! reachable from either non-terminal state. Terminal states never change.

use super::types::{AgentCard, TaskRequest, TaskSnapshot, TaskState};
use crate::llm::ProviderName;
use crate::research::{DataAggregator, DataSource, ResearchMaterial, SourceReport};
use crate::telemetry::ProgressSink;
use crate::types::{AppError, ProviderStatus, Result, SourceStatus};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::AbortHandle;
use tracing::{info, warn};
use uuid::Uuid;

struct TaskRecord {
    state: TaskState,
    request: TaskRequest,
    result: Option<ResearchMaterial>,
    error: Option<String>,
    partial: Vec<SourceReport>,
    handle: Option<AbortHandle>,
    finished_at: Option<Instant>,
}

impl TaskRecord {
    fn snapshot(&self, task_id: &str) -> TaskSnapshot {
        TaskSnapshot {
            task_id: task_id.to_string(),
            state: self.state,
            result: self.result.clone(),
            error: self.error.clone(),
            partial: self.partial.clone(),
        }
    }
}

type TaskTable = Arc<RwLock<HashMap<String, TaskRecord>>>;

pub struct TaskManager {
    aggregator: Arc<DataAggregator>,
    card: AgentCard,
    tasks: TaskTable,
    retention: usize,
}

impl TaskManager {
    pub fn new(aggregator: Arc<DataAggregator>, card: AgentCard, retention: usize) -> Self {
        Self {
            aggregator,
            card,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            retention: retention.max(1),
        }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    /// Accept a task and start it in the background. Must be called from
    /// within a tokio runtime.
    pub fn submit(&self, request: TaskRequest) -> Result<String> {
        if request.company.trim().is_empty() {
            return Err(AppError::InvalidInput("company must not be empty".into()));
        }

        let task_id = Uuid::new_v4().to_string();
        self.tasks.write().insert(
            task_id.clone(),
            TaskRecord {
                state: TaskState::Submitted,
                request: request.clone(),
                result: None,
                error: None,
                partial: Vec::new(),
                handle: None,
                finished_at: None,
            },
        );
        info!(task_id = %task_id, company = %request.company, "Research task submitted");

        let tasks = self.tasks.clone();
        let aggregator = self.aggregator.clone();
        let retention = self.retention;
        let id = task_id.clone();

        let join = tokio::spawn(async move {
            if !transition(&tasks, &id, TaskState::Working) {
                return;
            }

            let sink = TaskSink {
                tasks: tasks.clone(),
                task_id: id.clone(),
            };
            let reports = aggregator
                .collect_concurrent(&request.company, request.ticker.as_deref(), &sink)
                .await;

            let outcome = ResearchMaterial::new(request.company.clone(), request.ticker.clone(), reports)
                .ensure_usable();

            {
                let mut table = tasks.write();
                if let Some(record) = table.get_mut(&id) {
                    if !record.state.is_terminal() {
                        match outcome {
                            Ok(material) => {
                                record.state = TaskState::Completed;
                                record.result = Some(material);
                            }
                            Err(e) => {
                                record.state = TaskState::Failed;
                                record.error = Some(e.to_string());
                            }
                        }
                        record.finished_at = Some(Instant::now());
                        record.handle = None;
                        info!(task_id = %id, state = ?record.state, "Research task finished");
                    }
                }
            }
            prune(&tasks, retention);
        });

        if let Some(record) = self.tasks.write().get_mut(&task_id) {
            if !record.state.is_terminal() {
                record.handle = Some(join.abort_handle());
            }
        }

        Ok(task_id)
    }

    pub fn get(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.tasks
            .read()
            .get(task_id)
            .map(|r| r.snapshot(task_id))
            .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))
    }

    /// Best-effort cancellation. A terminal task is left untouched and its
    /// current state returned.
    pub fn cancel(&self, task_id: &str) -> Result<TaskState> {
        let state = {
            let mut table = self.tasks.write();
            let record = table
                .get_mut(task_id)
                .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))?;

            if !record.state.is_terminal() {
                record.state = TaskState::Cancelled;
                record.finished_at = Some(Instant::now());
                if let Some(handle) = record.handle.take() {
                    handle.abort();
                }
                info!(task_id = %task_id, company = %record.request.company, "Research task cancelled");
            }
            record.state
        };
        prune(&self.tasks, self.retention);
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

/// Move a task to a non-terminal state. Refused once the task is terminal.
fn transition(tasks: &TaskTable, task_id: &str, to: TaskState) -> bool {
    let mut table = tasks.write();
    match table.get_mut(task_id) {
        Some(record) if !record.state.is_terminal() => {
            record.state = to;
            true
        }
        Some(_) => false,
        None => {
            warn!(task_id = %task_id, "Transition on unknown task");
            false
        }
    }
}

/// Drop the oldest terminal tasks beyond the retention limit
fn prune(tasks: &TaskTable, retention: usize) {
    let mut table = tasks.write();
    let mut finished: Vec<(String, Instant)> = table
        .iter()
        .filter_map(|(id, r)| r.finished_at.map(|at| (id.clone(), at)))
        .collect();

    if finished.len() <= retention {
        return;
    }
    finished.sort_by_key(|(_, at)| *at);
    let excess = finished.len() - retention;
    for (id, _) in finished.into_iter().take(excess) {
        table.remove(&id);
    }
}

/// Records each finished source report on the task so pollers see progress
struct TaskSink {
    tasks: TaskTable,
    task_id: String,
}

impl ProgressSink for TaskSink {
    fn log(&self, _message: &str) {}

    fn provider_status(&self, _provider: ProviderName, _status: ProviderStatus) {}

    fn source_status(&self, _source: DataSource, _status: SourceStatus) {}

    fn metric(&self, _source: DataSource, _name: &str, _value: &Value) {}

    fn report(&self, report: &SourceReport) {
        if let Some(record) = self.tasks.write().get_mut(&self.task_id) {
            if !record.state.is_terminal() {
                record.partial.push(report.clone());
            }
        }
    }
}
