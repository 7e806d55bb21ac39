//! Progress reporting seam between the workflow engine and its building blocks
//!
//! The provider router and data aggregator do not own workflow state. They
//! report what they are doing through a [`ProgressSink`]; the engine's state
//! cell implements it and applies each event to the single `WorkflowState`.

use crate::llm::ProviderName;
use crate::research::{DataSource, SourceReport};
use crate::types::{ProviderStatus, SourceStatus};
use serde_json::Value;

pub trait ProgressSink: Send + Sync {
    /// Append an activity-log line for the step currently running
    fn log(&self, message: &str);

    fn provider_status(&self, provider: ProviderName, status: ProviderStatus);

    fn source_status(&self, source: DataSource, status: SourceStatus);

    /// Record one metric value as it arrives from a source
    fn metric(&self, source: DataSource, name: &str, value: &Value);

    /// Called once per source with its finished report
    fn report(&self, _report: &SourceReport) {}
}

/// Sink for callers that do not track progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn log(&self, _message: &str) {}

    fn provider_status(&self, _provider: ProviderName, _status: ProviderStatus) {}

    fn source_status(&self, _source: DataSource, _status: SourceStatus) {}

    fn metric(&self, _source: DataSource, _name: &str, _value: &Value) {}
}
