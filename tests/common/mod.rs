//! Shared fixtures for the integration tests

#![allow(dead_code)]

pub mod mocks;

use mocks::{ScriptedLLMClient, StaticSourceAdapter};
use std::sync::Arc;
use std::time::Duration;
use strata::llm::{ProviderRouter, RoutedProvider};
use strata::research::{DataAggregator, DataSource, DataSourceAdapter};
use strata::utils::toml_config::{QualityConfig, StrataConfig};
use strata::workflows::{
    InMemoryWorkflowStore, StatusDocument, WorkflowEngine, WorkflowService, WorkflowStatus,
};
use strata::AppState;

pub fn router(clients: &[Arc<ScriptedLLMClient>]) -> Arc<ProviderRouter> {
    let providers = clients
        .iter()
        .map(|c| RoutedProvider::new(c.clone(), Duration::from_secs(5)))
        .collect();
    Arc::new(ProviderRouter::new(providers).unwrap())
}

pub fn healthy_sources() -> Vec<Arc<StaticSourceAdapter>> {
    DataSource::ALL
        .iter()
        .map(|s| Arc::new(StaticSourceAdapter::healthy(*s)))
        .collect()
}

/// Healthy adapters for every source except `failing`
pub fn sources_failing(failing: &[DataSource]) -> Vec<Arc<StaticSourceAdapter>> {
    DataSource::ALL
        .iter()
        .map(|s| {
            if failing.contains(s) {
                Arc::new(StaticSourceAdapter::failing(*s))
            } else {
                Arc::new(StaticSourceAdapter::healthy(*s))
            }
        })
        .collect()
}

pub fn aggregator(adapters: &[Arc<StaticSourceAdapter>]) -> Arc<DataAggregator> {
    let adapters: Vec<Arc<dyn DataSourceAdapter>> = adapters
        .iter()
        .map(|a| a.clone() as Arc<dyn DataSourceAdapter>)
        .collect();
    Arc::new(DataAggregator::new(adapters, Duration::from_secs(5)))
}

pub fn engine(
    clients: &[Arc<ScriptedLLMClient>],
    adapters: &[Arc<StaticSourceAdapter>],
) -> WorkflowEngine {
    WorkflowEngine::new(router(clients), aggregator(adapters), QualityConfig::default())
}

pub fn service(engine: WorkflowEngine) -> Arc<WorkflowService> {
    Arc::new(WorkflowService::new(
        Arc::new(engine),
        Arc::new(InMemoryWorkflowStore::new()),
    ))
}

pub fn app_state(clients: &[Arc<ScriptedLLMClient>], workflows: Arc<WorkflowService>) -> AppState {
    AppState {
        config: Arc::new(StrataConfig::default()),
        router: router(clients),
        workflows,
        task_manager: None,
    }
}

/// Poll until the workflow reaches a terminal status
pub async fn wait_terminal(service: &WorkflowService, workflow_id: &str) -> StatusDocument {
    wait_until(service, workflow_id, |doc| doc.status.is_terminal()).await
}

pub async fn wait_until(
    service: &WorkflowService,
    workflow_id: &str,
    done: impl Fn(&StatusDocument) -> bool,
) -> StatusDocument {
    for _ in 0..500 {
        let doc = service.status(workflow_id).unwrap();
        if done(&doc) {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow {} did not reach the expected state", workflow_id);
}

pub fn assert_no_executing(doc: &StatusDocument) {
    use strata::types::{ProviderStatus, SourceStatus};
    for (source, status) in doc.mcp_status.iter() {
        assert_ne!(status, SourceStatus::Executing, "{:?} left executing", source);
    }
    for (provider, status) in doc.llm_status.iter() {
        assert_ne!(status, ProviderStatus::Executing, "{:?} left executing", provider);
    }
}

pub fn is_status(doc: &StatusDocument, status: WorkflowStatus) -> bool {
    doc.status == status
}
