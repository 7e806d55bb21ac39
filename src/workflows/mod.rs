//! SWOT Workflow Module
//!
//! One workflow turns an [`AnalysisRequest`](crate::types::AnalysisRequest)
//! into a quality-checked SWOT report. The step topology is fixed; tuning
//! lives in configuration:
//!
//! ```toml
//! [quality]
//! objective_weight = 0.4
//! subjective_weight = 0.6
//! pass_threshold = 7
//! max_revisions = 3
//!
//! [cache]
//! enabled = true
//! ttl_hours = 24
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = WorkflowEngine::new(router, aggregator, config.quality.clone())
//!     .with_cache(Arc::new(AnalysisCache::from_config(&config.cache)));
//! let service = WorkflowService::new(Arc::new(engine), Arc::new(InMemoryWorkflowStore::new()));
//!
//! let id = service.start(AnalysisRequest::new("Tesla").with_ticker("TSLA"))?;
//! let status = service.status(&id)?;
//! println!("{} at {}", status.status.as_str(), status.current_step);
//! ```

pub mod cache;
pub mod engine;
pub mod prompts;
pub mod report;
pub mod service;
pub mod state;
pub mod store;

pub use cache::{AnalysisCache, CacheKey, CachedAnalysis};
pub use engine::{next_step, AbortController, AbortSignal, LoopPolicy, StateCell, StepOutcome, WorkflowEngine};
pub use report::{Confidence, FinalReport, Readiness};
pub use service::WorkflowService;
pub use state::{StatusDocument, Step, WorkflowState, WorkflowStatus};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
