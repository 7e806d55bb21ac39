//! Agent-to-agent research delegation
//!
//! The researcher step can hand data gathering to an out-of-process executor
//! that runs the six source calls concurrently. The executor advertises an
//! [`AgentCard`] and accepts JSON-RPC 2.0 `submit`/`get`/`cancel` calls.
//!
//! - [`TaskManager`] is the executor: task table plus background gathers
//! - [`server::router`] mounts it over HTTP
//! - [`HttpA2AClient`] talks to a remote executor
//! - [`RemoteResearch`] drives one delegation from the workflow side
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(HttpA2AClient::new(http, "http://research:8001"));
//! let remote = RemoteResearch::new(transport, &config.a2a);
//! match remote.run(&request, &sink).await {
//!     Ok(material) => { /* use it */ }
//!     Err(failure) => { /* gather failure.outstanding() locally */ }
//! }
//! ```

pub mod client;
pub mod delegate;
pub mod manager;
pub mod server;
pub mod types;

pub use client::{HttpA2AClient, TaskTransport};
pub use delegate::{DelegationFailure, RemoteResearch};
pub use manager::TaskManager;
pub use types::{AgentCard, TaskRequest, TaskSnapshot, TaskState};
