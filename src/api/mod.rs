/// HTTP trigger surface
///
/// REST endpoints for workflow management, schedule management, run-now, and
/// execution polling. This layer owns no execution logic; it translates HTTP
/// into calls on the storage, scheduler, and engine.

use crate::runtime::engine::ExecutionEngine;
use crate::runtime::scheduler::WorkflowScheduler;
use crate::workflow::storage::WorkflowStorage;
use std::sync::Arc;

// Workflow CRUD and schedule management
pub mod workflows;

// Run-now trigger and execution polling
pub mod runs;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// SQLite persistence for workflows and executions
    pub storage: WorkflowStorage,
    /// Cron scheduler owning the workflow→timer bindings
    pub scheduler: Arc<WorkflowScheduler>,
    /// Execution engine for manual runs
    pub engine: Arc<ExecutionEngine>,
}
