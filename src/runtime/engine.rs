/// Workflow execution engine
///
/// Walks a `WorkflowGraph` from its trigger node, recursing into children in
/// edge declaration order, aggregating per-node payloads into a result tree,
/// and persisting the run's lifecycle through the execution store. The run is
/// atomic from the caller's perspective: on any escaping node error the
/// record flips to `failed` with no partial output, even though node side
/// effects (a message already sent) are not undone.

use crate::runtime::executor::{Context, NodeExecutor};
use crate::workflow::graph::{build_graph, WorkflowGraph};
use crate::workflow::storage::ExecutionStore;
use crate::workflow::types::{Execution, ExecutionStatus, Node, Workflow};
use anyhow::Result;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Drives graph traversal and owns execution record transitions
///
/// Child-node visits within one run are strictly sequential, which keeps
/// output ordering deterministic; concurrency exists only across runs, each
/// on its own tokio task. Cloning shares the executor and store.
#[derive(Clone)]
pub struct ExecutionEngine {
    executor: Arc<NodeExecutor>,
    executions: Arc<dyn ExecutionStore>,
}

impl ExecutionEngine {
    pub fn new(executor: Arc<NodeExecutor>, executions: Arc<dyn ExecutionStore>) -> Self {
        Self {
            executor,
            executions,
        }
    }

    /// Execute a workflow definition against an already-created run record
    ///
    /// Graph construction failures are configuration errors: they fail the
    /// run record synchronously instead of escaping to the caller.
    pub async fn run_workflow(&self, workflow: &Workflow, execution_id: &str) -> Result<()> {
        match build_graph(&workflow.nodes, &workflow.edges) {
            Ok(graph) => self.run(&graph, execution_id).await,
            Err(e) => {
                tracing::error!(
                    "❌ Workflow '{}' has an invalid graph: {}",
                    workflow.id,
                    e
                );
                self.executions
                    .update_execution(execution_id, ExecutionStatus::Failed, None, Some(e.to_string()))
                    .await
            }
        }
    }

    /// Execute a built graph, transitioning the run record exactly once
    ///
    /// Returns `Err` only when the store itself fails; traversal failures are
    /// recorded on the execution record, which is the sole error channel for
    /// callers of the fire-and-forget paths.
    pub async fn run(&self, graph: &WorkflowGraph, execution_id: &str) -> Result<()> {
        let start = std::time::Instant::now();
        tracing::info!(
            "🚀 Starting execution {} ({} nodes)",
            execution_id,
            graph.node_count()
        );

        let trigger = match graph.trigger_node() {
            Some(node) => node,
            None => {
                tracing::error!("❌ Execution {} aborted: no trigger node found", execution_id);
                return self
                    .executions
                    .update_execution(
                        execution_id,
                        ExecutionStatus::Failed,
                        None,
                        Some("no trigger node found".to_string()),
                    )
                    .await;
            }
        };

        match self.visit(graph, trigger, Context::new()).await {
            Ok(output) => {
                tracing::info!(
                    "🎉 Execution {} completed in {:?}",
                    execution_id,
                    start.elapsed()
                );
                self.executions
                    .update_execution(execution_id, ExecutionStatus::Completed, Some(output), None)
                    .await
            }
            Err(e) => {
                tracing::error!(
                    "❌ Execution {} failed in {:?}: {}",
                    execution_id,
                    start.elapsed(),
                    e
                );
                self.executions
                    .update_execution(execution_id, ExecutionStatus::Failed, None, Some(e.to_string()))
                    .await
            }
        }
    }

    /// Create a run record and execute in the background (fire-and-forget)
    ///
    /// Returns the record immediately; callers poll it for the outcome. Used
    /// by the "run now" trigger surface.
    pub async fn start_run(&self, workflow: Workflow, input: Value) -> Result<Execution> {
        let execution = self
            .executions
            .create_execution(&workflow.id, input)
            .await?;

        let engine = self.clone();
        let execution_id = execution.id.clone();
        tokio::spawn(async move {
            // Failures are already recorded on the execution record; a store
            // error here has nowhere else to go but the log.
            if let Err(e) = engine.run_workflow(&workflow, &execution_id).await {
                tracing::error!("❌ Could not persist outcome of execution {}: {}", execution_id, e);
            }
        });

        Ok(execution)
    }

    /// Recursive traversal: execute the node, then its children sequentially
    ///
    /// The child context is the parent context shallow-merged with the
    /// parent's own payload (children excluded), later keys overwriting
    /// earlier ones. Each child's tree lands in this node's `children` array,
    /// in edge declaration order, duplicates included.
    fn visit<'a>(
        &'a self,
        graph: &'a WorkflowGraph,
        node: &'a Node,
        context: Context,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.executor.execute(node, &context).await?;

            let mut child_context = context;
            for (key, value) in &payload {
                child_context.insert(key.clone(), value.clone());
            }

            let mut children = Vec::new();
            for child_id in graph.children(&node.id) {
                let child = graph
                    .node(child_id)
                    .ok_or_else(|| anyhow::anyhow!("edge references unknown node: {child_id}"))?;
                children.push(self.visit(graph, child, child_context.clone()).await?);
            }

            let mut tree = payload;
            tree.insert("children".to_string(), Value::Array(children));
            Ok(Value::Object(tree))
        })
    }
}
