/// Workflow start, status, result and abort.
pub mod analysis;
/// Service health.
pub mod health;
