/// SQLite persistence layer for workflows and execution records
///
/// The engine and scheduler never touch SQL directly; they consume the narrow
/// `WorkflowStore` / `ExecutionStore` traits below. `WorkflowStorage` is the
/// production implementation backed by a single SQLite database. Workflow
/// definitions are stored as JSON for flexibility while activation and
/// schedule state live in indexed columns.

use crate::workflow::types::{Execution, ExecutionStatus, StoredWorkflow, Workflow};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

/// Read access to persisted workflow definitions
///
/// The narrow contract the scheduler and the trigger surface need: load one
/// workflow with its activation/schedule state, and enumerate the workflows
/// that should be scheduled at startup.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_workflow(&self, id: &str) -> Result<Option<StoredWorkflow>>;

    /// Every workflow with `is_active` and a non-null schedule
    async fn list_active_scheduled(&self) -> Result<Vec<ScheduledWorkflow>>;
}

/// Lifecycle access to execution records
///
/// Executions are created in `running` state and transitioned exactly once by
/// `update_execution`; callers poll the record instead of relying on a
/// synchronous error channel.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, workflow_id: &str, input: Value) -> Result<Execution>;

    async fn update_execution(
        &self,
        id: &str,
        status: ExecutionStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> Result<()>;

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>>;

    async fn list_executions(&self, workflow_id: &str, limit: i64) -> Result<Vec<Execution>>;
}

/// Id + cron pair returned by `list_active_scheduled`
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScheduledWorkflow {
    pub id: String,
    pub schedule: String,
}

/// Basic workflow metadata for listing operations
#[derive(Debug, serde::Serialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub schedule: Option<String>,
    pub updated_at: String,
}

/// SQLite-backed implementation of both store traits
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                definition JSON NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                schedule TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                status TEXT NOT NULL,
                input JSON NOT NULL,
                output JSON,
                error TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Scheduler startup scans for active scheduled workflows
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_workflows_schedule
            ON workflows(is_active, schedule)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_executions_workflow
            ON executions(workflow_id, started_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a new workflow definition or update an existing one
    ///
    /// Uses UPSERT so create and update are one operation; activation and
    /// schedule state are left alone on update (they have their own setters).
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        let definition_json = serde_json::to_string(workflow)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, definition, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&workflow.id)
        .bind(&workflow.name)
        .bind(&definition_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set or clear a workflow's cron schedule
    pub async fn set_schedule(&self, id: &str, schedule: Option<&str>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workflows SET schedule = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(schedule)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Activate or deactivate a workflow
    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workflows SET is_active = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all workflows with basic metadata
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowMetadata>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, is_active, schedule, updated_at
            FROM workflows ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::new();
        for row in rows {
            workflows.push(WorkflowMetadata {
                id: row.get("id"),
                name: row.get("name"),
                is_active: row.get("is_active"),
                schedule: row.get("schedule"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(workflows)
    }

    /// Delete a workflow by ID
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("invalid timestamp '{}': {}", raw, e))?
        .with_timezone(&Utc))
}

fn execution_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Execution> {
    let status_raw: String = row.get("status");
    let input_raw: String = row.get("input");
    let output_raw: Option<String> = row.get("output");
    let started_raw: String = row.get("started_at");
    let completed_raw: Option<String> = row.get("completed_at");

    Ok(Execution {
        id: row.get("id"),
        workflow_id: row.get("workflow_id"),
        status: status_raw
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        input: serde_json::from_str(&input_raw)?,
        output: output_raw
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        error: row.get("error"),
        started_at: parse_timestamp(&started_raw)?,
        completed_at: completed_raw
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
    })
}

#[async_trait]
impl WorkflowStore for WorkflowStorage {
    async fn get_workflow(&self, id: &str) -> Result<Option<StoredWorkflow>> {
        let row = sqlx::query("SELECT definition, is_active, schedule FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition_json: String = row.get("definition");
                let workflow: Workflow = serde_json::from_str(&definition_json)?;
                Ok(Some(StoredWorkflow {
                    workflow,
                    is_active: row.get("is_active"),
                    schedule: row.get("schedule"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_active_scheduled(&self) -> Result<Vec<ScheduledWorkflow>> {
        let rows = sqlx::query(
            "SELECT id, schedule FROM workflows WHERE is_active = 1 AND schedule IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ScheduledWorkflow {
                id: row.get("id"),
                schedule: row.get("schedule"),
            })
            .collect())
    }
}

#[async_trait]
impl ExecutionStore for WorkflowStorage {
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

        sqlx::query(
            r#"
            INSERT INTO executions (id, workflow_id, status, input, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&execution.id)
        .bind(&execution.workflow_id)
        .bind(execution.status.to_string())
        .bind(serde_json::to_string(&execution.input)?)
        .bind(execution.started_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(execution)
    }

    async fn update_execution(
        &self,
        id: &str,
        status: ExecutionStatus,
        output: Option<Value>,
        error: Option<String>,
    ) -> Result<()> {
        let output_json = output.map(|v| serde_json::to_string(&v)).transpose()?;
        let completed_at = status.is_terminal().then(|| Utc::now().to_rfc3339());

        sqlx::query(
            r#"
            UPDATE executions
            SET status = ?, output = ?, error = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(output_json)
        .bind(error)
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_execution(&self, id: &str) -> Result<Option<Execution>> {
        let row = sqlx::query("SELECT * FROM executions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(execution_from_row).transpose()
    }

    async fn list_executions(&self, workflow_id: &str, limit: i64) -> Result<Vec<Execution>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM executions
            WHERE workflow_id = ?
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(execution_from_row).collect()
    }
}
