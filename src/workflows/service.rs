//! Workflow lifecycle: start, observe, abort

use super::engine::{AbortController, AbortSignal, StateCell, WorkflowEngine};
use super::report::FinalReport;
use super::state::{StatusDocument, WorkflowState, WorkflowStatus};
use super::store::WorkflowStore;
use crate::types::{AnalysisRequest, AppError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct WorkflowService {
    engine: Arc<WorkflowEngine>,
    store: Arc<dyn WorkflowStore>,
    running: Arc<Mutex<HashMap<String, AbortController>>>,
}

impl WorkflowService {
    pub fn new(engine: Arc<WorkflowEngine>, store: Arc<dyn WorkflowStore>) -> Self {
        Self {
            engine,
            store,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Validate the request, save the `starting` snapshot and run the engine
    /// in the background. Returns the new workflow id immediately.
    pub fn start(&self, request: AnalysisRequest) -> Result<String> {
        let request = request.normalized()?;
        let workflow_id = Uuid::new_v4().to_string();
        let state = WorkflowState::new(workflow_id.clone(), &request);
        let cell = Arc::new(StateCell::new(state, self.store.clone()));

        let (controller, signal) = AbortController::channel();
        self.running.lock().insert(workflow_id.clone(), controller);

        let engine = self.engine.clone();
        let running = self.running.clone();
        let id = workflow_id.clone();
        tokio::spawn(async move {
            engine.run(&cell, signal).await;
            running.lock().remove(&id);
        });

        info!(workflow_id = %workflow_id, company = %request.company, "Workflow scheduled");
        Ok(workflow_id)
    }

    /// Run one workflow on the current task and return its final state
    pub async fn run_to_completion(&self, request: AnalysisRequest) -> Result<WorkflowState> {
        self.run_with_abort(request, AbortSignal::never()).await
    }

    /// Like [`run_to_completion`](Self::run_to_completion), stopping early
    /// once `abort` fires. The returned state is then `aborted`.
    pub async fn run_with_abort(
        &self,
        request: AnalysisRequest,
        abort: AbortSignal,
    ) -> Result<WorkflowState> {
        let request = request.normalized()?;
        let state = WorkflowState::new(Uuid::new_v4().to_string(), &request);
        let cell = StateCell::new(state, self.store.clone());
        self.engine.run(&cell, abort).await;
        Ok(cell.snapshot())
    }

    pub fn status(&self, workflow_id: &str) -> Result<StatusDocument> {
        Ok(self.load(workflow_id)?.status_document())
    }

    pub fn result(&self, workflow_id: &str) -> Result<FinalReport> {
        let state = self.load(workflow_id)?;
        match state.status() {
            WorkflowStatus::Completed => state
                .report
                .ok_or_else(|| AppError::Internal(format!("workflow {} has no report", workflow_id))),
            WorkflowStatus::Aborted => Err(AppError::Aborted(format!(
                "workflow {} was aborted",
                workflow_id
            ))),
            WorkflowStatus::Error => Err(AppError::Internal(
                state
                    .error
                    .unwrap_or_else(|| format!("workflow {} failed", workflow_id)),
            )),
            WorkflowStatus::Starting | WorkflowStatus::Running => Err(AppError::NotFound(format!(
                "workflow {} has no result yet",
                workflow_id
            ))),
        }
    }

    /// Request cancellation. Returns false when the workflow had already
    /// reached a terminal status.
    pub fn abort(&self, workflow_id: &str) -> Result<bool> {
        let state = self.load(workflow_id)?;
        if state.is_terminal() {
            return Ok(false);
        }
        match self.running.lock().get(workflow_id) {
            Some(controller) => {
                controller.abort();
                info!(workflow_id = %workflow_id, "Abort requested");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn load(&self, workflow_id: &str) -> Result<WorkflowState> {
        self.store
            .load(workflow_id)
            .ok_or_else(|| AppError::NotFound(format!("workflow {}", workflow_id)))
    }
}
