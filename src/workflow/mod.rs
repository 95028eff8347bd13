/// Workflow Management Layer
///
/// This module handles workflow definitions, graph construction, and
/// persistence. It provides:
/// - Type definitions (Workflow, Node, Edge, Execution)
/// - Per-execution graph construction with cycle rejection
/// - SQLite persistence with sqlx behind narrow store traits

// Core workflow type definitions
pub mod types;

// Per-execution graph model
pub mod graph;

// SQLite persistence layer and store traits
pub mod storage;

// Re-export commonly used types
pub use graph::{build_graph, GraphError, WorkflowGraph};
pub use storage::{ExecutionStore, WorkflowStorage, WorkflowStore};
pub use types::{Edge, Execution, ExecutionStatus, Node, NodeType, StoredWorkflow, Workflow};
