//! Workflow snapshot persistence

use super::state::WorkflowState;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Receives a snapshot after every state change. Implementations must not
/// block for long; saves happen on the engine's task.
pub trait WorkflowStore: Send + Sync {
    fn save(&self, workflow_id: &str, snapshot: WorkflowState);

    fn load(&self, workflow_id: &str) -> Option<WorkflowState>;

    fn ids(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct InMemoryWorkflowStore {
    snapshots: RwLock<HashMap<String, WorkflowState>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn save(&self, workflow_id: &str, snapshot: WorkflowState) {
        self.snapshots
            .write()
            .insert(workflow_id.to_string(), snapshot);
    }

    fn load(&self, workflow_id: &str) -> Option<WorkflowState> {
        self.snapshots.read().get(workflow_id).cloned()
    }

    fn ids(&self) -> Vec<String> {
        self.snapshots.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisRequest;

    #[test]
    fn save_replaces_previous_snapshot() {
        let store = InMemoryWorkflowStore::new();
        let request = AnalysisRequest::new("Acme").normalized().unwrap();
        let mut state = WorkflowState::new("wf-1", &request);
        store.save("wf-1", state.clone());

        state.draft = Some("draft".into());
        store.save("wf-1", state);

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("wf-1").unwrap().draft.as_deref(), Some("draft"));
        assert!(store.load("missing").is_none());
    }
}
