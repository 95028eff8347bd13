//! In-memory store used by the engine and scheduler integration tests, so no
//! SQLite file is needed. Mirrors the narrow store traits exactly.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use workloom::workflow::storage::{ExecutionStore, ScheduledWorkflow, WorkflowStore};
use workloom::workflow::types::{
    Edge, Execution, ExecutionStatus, Node, NodeType, StoredWorkflow, Workflow,
};

#[derive(Default)]
pub struct MemoryStore {
    workflows: Mutex<HashMap<String, StoredWorkflow>>,
    executions: Mutex<HashMap<String, Execution>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workflow(&self, stored: StoredWorkflow) {
        self.workflows
            .lock()
            .unwrap()
            .insert(stored.workflow.id.clone(), stored);
    }

    pub fn execution(&self, id: &str) -> Option<Execution> {
        self.executions.lock().unwrap().get(id).cloned()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }

    pub fn executions_for(&self, workflow_id: &str) -> Vec<Execution> {
        self.executions
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<StoredWorkflow>> {
        Ok(self.workflows.lock().unwrap().get(id).cloned())
    }

    async fn list_active_scheduled(&self) -> Result<Vec<ScheduledWorkflow>> {
        Ok(self
            .workflows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_active)
            .filter_map(|s| {
                s.schedule.clone().map(|schedule| ScheduledWorkflow {
                    id: s.workflow.id.clone(),
                    schedule,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(&self, workflow_id: &str, input: Value) -> Result<Execution> {
        let execution = Execution {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            status: ExecutionStatus::Running,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };

        self.executions
            .lock()
            .unwrap()
            .insert(execution.id.clone(), execution.clone());
        Ok(execution)
    }

    async fn update_execution(
        &self,
        id: &str,
        status: ExecutionStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> Result<()> {
        let mut executions = self.executions.lock().unwrap();
        let execution = executions
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("unknown execution: {id}"))?;

        execution.status = status;
        execution.output = output;
        execution.error = error;
        if status.is_terminal() {
            execution.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>> {
        Ok(self.executions.lock().unwrap().get(id).cloned())
    }

    async fn list_executions(&self, workflow_id: &str, limit: i64) -> Result<Vec<Execution>> {
        let mut executions = self.executions_for(workflow_id);
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions.truncate(limit as usize);
        Ok(executions)
    }
}

pub fn node(id: &str, node_type: NodeType, config: Value) -> Node {
    Node {
        id: id.to_string(),
        node_type,
        title: String::new(),
        config,
    }
}

pub fn edge(from: &str, to: &str) -> Edge {
    Edge {
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub fn workflow(id: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> Workflow {
    Workflow {
        id: id.to_string(),
        name: id.to_string(),
        nodes,
        edges,
    }
}
