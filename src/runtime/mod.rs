/// Runtime Execution Layer
///
/// This module turns stored graphs into runs. It handles:
/// - Per-node dispatch through the handler lookup table
/// - Recursive, strictly sequential graph traversal with context merging
/// - Execution record lifecycle (running → completed/failed)
/// - Cron-driven re-triggering of active workflows

// Graph traversal and execution record lifecycle
pub mod engine;

// Individual node execution handlers
pub mod executor;

// Background cron scheduler
pub mod scheduler;

// Re-export main types
pub use engine::ExecutionEngine;
pub use executor::{Context, NodeExecutor, NodeHandler, NodePayload};
pub use scheduler::{ScheduleError, WorkflowScheduler};
