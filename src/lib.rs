/// Workloom: workflow automation runtime
///
/// This library turns stored node/edge automation graphs into runs, tracks
/// run state, and re-triggers runs on a cron cadence. Natural-language graph
/// generation, visual editing, and per-service API clients live outside this
/// crate and are consumed through narrow interfaces.

// Core configuration and setup
pub mod config;

// Workflow management layer - definitions, graph construction, persistence
pub mod workflow;

// Runtime execution layer - node dispatch, graph traversal, cron scheduling
pub mod runtime;

// Notifier collaborators for messaging-channel nodes
pub mod notify;

// HTTP API layer - workflow management, schedule management, run triggers
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use notify::{Notifier, NotifierRegistry, NotifyOutcome};
pub use runtime::{ExecutionEngine, NodeExecutor, ScheduleError, WorkflowScheduler};
pub use server::start_server;
pub use workflow::{
    build_graph, Edge, Execution, ExecutionStatus, GraphError, Node, NodeType, Workflow,
};
