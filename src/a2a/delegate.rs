//! Caller side of delegated research
//!
//! [`RemoteResearch`] discovers the executor once, submits a task and polls
//! it with a per-request timeout under an overall deadline. Finished source
//! reports are forwarded to the progress sink while polling, each at most
//! once. When the delegation fails the remote task is cancelled and the
//! reports received so far are handed back so the caller only gathers the
//! remaining sources locally.

use super::client::TaskTransport;
use super::types::{AgentCard, TaskRequest, TaskState, RESEARCH_SKILL};
use crate::research::aggregator::record_report;
use crate::research::{DataSource, ResearchMaterial, SourceReport};
use crate::telemetry::ProgressSink;
use crate::types::{AppError, SourceStatus};
use crate::utils::toml_config::A2AConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{info, warn};

/// Why a delegation did not produce material, and what it did produce
#[derive(Debug, Clone)]
pub struct DelegationFailure {
    pub reason: String,
    pub partial: Vec<SourceReport>,
}

impl DelegationFailure {
    fn new(reason: impl Into<String>, partial: Vec<SourceReport>) -> Self {
        Self {
            reason: reason.into(),
            partial,
        }
    }

    /// Sources the remote side never reported on
    pub fn outstanding(&self) -> Vec<DataSource> {
        DataSource::ALL
            .iter()
            .copied()
            .filter(|s| !self.partial.iter().any(|r| r.source == *s))
            .collect()
    }
}

pub struct RemoteResearch {
    transport: Arc<dyn TaskTransport>,
    card: OnceCell<AgentCard>,
    poll_interval: Duration,
    poll_timeout: Duration,
    deadline: Duration,
}

impl RemoteResearch {
    pub fn new(transport: Arc<dyn TaskTransport>, config: &A2AConfig) -> Self {
        Self {
            transport,
            card: OnceCell::new(),
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            deadline: config.deadline(),
        }
    }

    async fn discover(&self) -> Result<&AgentCard, String> {
        self.card
            .get_or_try_init(|| async {
                let card = tokio::time::timeout(self.poll_timeout, self.transport.agent_card())
                    .await
                    .map_err(|_| "agent card request timed out".to_string())?
                    .map_err(|e| e.to_string())?;
                if !card.has_skill(RESEARCH_SKILL) {
                    return Err(format!("agent '{}' does not offer the research skill", card.name));
                }
                info!(agent = %card.name, version = %card.version, "Discovered research executor");
                Ok(card)
            })
            .await
    }

    pub async fn run(
        &self,
        request: &TaskRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ResearchMaterial, DelegationFailure> {
        let card = self
            .discover()
            .await
            .map_err(|reason| DelegationFailure::new(reason, Vec::new()))?;
        sink.log(&format!("Delegating research to {}", card.name));

        let task_id = match tokio::time::timeout(self.poll_timeout, self.transport.submit(request)).await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return Err(DelegationFailure::new(e.to_string(), Vec::new())),
            Err(_) => return Err(DelegationFailure::new("task submission timed out", Vec::new())),
        };
        info!(task_id = %task_id, "Research task submitted");

        for source in DataSource::ALL {
            sink.source_status(source, SourceStatus::Executing);
        }

        let mut guard = CancelOnDrop::new(self.transport.clone(), task_id.clone());
        let deadline = Instant::now() + self.deadline;
        let mut forwarded: HashSet<DataSource> = HashSet::new();
        let mut received: Vec<SourceReport> = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let attempt = self.poll_timeout.min(deadline - now);

            match tokio::time::timeout(attempt, self.transport.get(&task_id)).await {
                Ok(Ok(snapshot)) => {
                    for report in snapshot.partial {
                        if forwarded.insert(report.source) {
                            record_report(&report, sink);
                            received.push(report);
                        }
                    }

                    match snapshot.state {
                        TaskState::Completed => {
                            guard.disarm();
                            return match snapshot.result {
                                Some(material) => {
                                    for report in &material.reports {
                                        if forwarded.insert(report.source) {
                                            record_report(report, sink);
                                        }
                                    }
                                    Ok(material)
                                }
                                None => Err(DelegationFailure::new(
                                    "remote task completed without a result",
                                    received,
                                )),
                            };
                        }
                        TaskState::Failed => {
                            guard.disarm();
                            let reason = snapshot
                                .error
                                .unwrap_or_else(|| "remote task failed".to_string());
                            return Err(DelegationFailure::new(reason, received));
                        }
                        TaskState::Cancelled => {
                            guard.disarm();
                            return Err(DelegationFailure::new("remote task was cancelled", received));
                        }
                        TaskState::Submitted | TaskState::Working => {}
                    }
                }
                Ok(Err(AppError::NotFound(_))) => {
                    guard.disarm();
                    return Err(DelegationFailure::new("remote task disappeared", received));
                }
                Ok(Err(e)) => warn!(task_id = %task_id, "Poll failed: {}", e),
                Err(_) => warn!(task_id = %task_id, "Poll attempt timed out"),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }

        guard.disarm();
        self.cancel_remote(&task_id).await;
        Err(DelegationFailure::new(
            format!("remote task exceeded {}s deadline", self.deadline.as_secs()),
            received,
        ))
    }

    async fn cancel_remote(&self, task_id: &str) {
        match tokio::time::timeout(self.poll_timeout, self.transport.cancel(task_id)).await {
            Ok(Ok(state)) => info!(task_id = %task_id, state = ?state, "Remote task cancelled"),
            Ok(Err(e)) => warn!(task_id = %task_id, "Remote cancel failed: {}", e),
            Err(_) => warn!(task_id = %task_id, "Remote cancel timed out"),
        }
    }
}

/// Cancels the remote task if the polling future is dropped mid-flight,
/// e.g. when the workflow is aborted.
struct CancelOnDrop {
    transport: Arc<dyn TaskTransport>,
    task_id: Option<String>,
}

impl CancelOnDrop {
    fn new(transport: Arc<dyn TaskTransport>, task_id: String) -> Self {
        Self {
            transport,
            task_id: Some(task_id),
        }
    }

    fn disarm(&mut self) {
        self.task_id = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        let Some(task_id) = self.task_id.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(task_id = %task_id, "No runtime to cancel abandoned remote task");
            return;
        };
        let transport = self.transport.clone();
        handle.spawn(async move {
            match transport.cancel(&task_id).await {
                Ok(state) => info!(task_id = %task_id, state = ?state, "Abandoned remote task cancelled"),
                Err(e) => warn!(task_id = %task_id, "Cancel of abandoned task failed: {}", e),
            }
        });
    }
}
