/// Background cron scheduler
///
/// Maps workflow ids to recurring timers using tokio-cron-scheduler. An
/// explicit instance owns the binding map (no global state); bindings are
/// rebuilt at startup from the workflow store's `schedule` field. A fire
/// reloads the workflow, skips it when it was deleted or deactivated in the
/// meantime, and otherwise creates an execution record and invokes the
/// engine. Nothing a single workflow does can take down the timer loop.

use crate::runtime::engine::ExecutionEngine;
use crate::workflow::storage::{ExecutionStore, WorkflowStore};
use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

/// Schedule configuration errors, rejected synchronously
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

/// Live association between a workflow and its active cron timer
#[derive(Debug, Clone)]
struct ScheduledBinding {
    job_id: Uuid,
    cron: String,
}

/// Cron-driven trigger service for active workflows
///
/// The binding map is the only shared mutable state in the process; schedule
/// and unschedule calls can race with timer fires, so everything goes through
/// the async locks.
pub struct WorkflowScheduler {
    scheduler: RwLock<JobScheduler>,
    bindings: RwLock<HashMap<String, ScheduledBinding>>,
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    engine: Arc<ExecutionEngine>,
}

/// Normalize a standard 5-field cron expression to the 6-field form the
/// underlying scheduler parses (seconds prepended). Field-count errors are
/// caught here; grammar errors inside a field surface when the job is built.
fn normalize_cron(expr: &str) -> Result<String, ScheduleError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason: format!(
                "expected 5 fields (minute hour day month weekday), got {}",
                fields.len()
            ),
        });
    }
    Ok(format!("0 {}", fields.join(" ")))
}

impl WorkflowScheduler {
    pub async fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        engine: Arc<ExecutionEngine>,
    ) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: RwLock::new(scheduler),
            bindings: RwLock::new(HashMap::new()),
            workflows,
            executions,
            engine,
        })
    }

    /// Load every active workflow with a schedule and start the timer loop
    ///
    /// A malformed schedule is surfaced per workflow (error log with the id)
    /// and skipped; startup itself never fails because one workflow is bad.
    pub async fn initialize(&self) -> Result<()> {
        let scheduled = self.workflows.list_active_scheduled().await?;
        let total = scheduled.len();
        let mut skipped = 0usize;

        for entry in scheduled {
            if let Err(e) = self.schedule_workflow(&entry.id, &entry.schedule).await {
                tracing::error!(
                    "❌ Skipping schedule for workflow '{}' ({}): {}",
                    entry.id,
                    entry.schedule,
                    e
                );
                skipped += 1;
            }
        }

        {
            let scheduler = self.scheduler.read().await;
            scheduler.start().await?;
        }

        tracing::info!(
            "⏰ Scheduler started: {} of {} stored schedules active ({} skipped)",
            total - skipped,
            total,
            skipped
        );
        Ok(())
    }

    /// Bind `workflow_id` to a recurring cron timer
    ///
    /// Validates the expression before touching any existing binding, so a
    /// bad re-schedule leaves the previous one running. Re-scheduling with a
    /// valid expression replaces the binding (idempotent).
    pub async fn schedule_workflow(
        &self,
        workflow_id: &str,
        cron_expr: &str,
    ) -> Result<(), ScheduleError> {
        let normalized = normalize_cron(cron_expr)?;

        // Clone the collaborators into the job closure; the fire must not
        // keep the scheduler itself alive.
        let workflows = Arc::clone(&self.workflows);
        let executions = Arc::clone(&self.executions);
        let engine = Arc::clone(&self.engine);
        let fire_workflow_id = workflow_id.to_string();
        let job = Job::new_async(normalized.as_str(), move |_uuid, _lock| {
            let workflows = Arc::clone(&workflows);
            let executions = Arc::clone(&executions);
            let engine = Arc::clone(&engine);
            let workflow_id = fire_workflow_id.clone();

            Box::pin(async move {
                tracing::debug!("🔔 Cron fired for workflow '{}'", workflow_id);
                if let Err(e) = fire(&workflows, &executions, &engine, &workflow_id).await {
                    // Contained here: one workflow's failure never stops the
                    // timer loop or other bindings.
                    tracing::error!("❌ Scheduled run of workflow '{}' failed: {}", workflow_id, e);
                }
            })
        })
        .map_err(|e| ScheduleError::InvalidCron {
            expr: cron_expr.to_string(),
            reason: e.to_string(),
        })?;

        // Binding map lock held across the replace so a concurrent
        // re-schedule cannot interleave.
        let mut bindings = self.bindings.write().await;

        if let Some(old) = bindings.remove(workflow_id) {
            let scheduler = self.scheduler.read().await;
            if let Err(e) = scheduler.remove(&old.job_id).await {
                tracing::warn!(
                    "⚠️ Failed to remove previous cron job for '{}': {}",
                    workflow_id,
                    e
                );
            }
        }

        let job_id = {
            let scheduler = self.scheduler.write().await;
            scheduler.add(job).await?
        };

        bindings.insert(
            workflow_id.to_string(),
            ScheduledBinding {
                job_id,
                cron: cron_expr.to_string(),
            },
        );

        tracing::info!("⏰ Scheduled workflow '{}' ({})", workflow_id, cron_expr);
        Ok(())
    }

    /// Stop and remove the binding for `workflow_id`; no-op if none exists
    pub async fn unschedule_workflow(&self, workflow_id: &str) {
        let mut bindings = self.bindings.write().await;

        match bindings.remove(workflow_id) {
            Some(binding) => {
                let scheduler = self.scheduler.read().await;
                if let Err(e) = scheduler.remove(&binding.job_id).await {
                    tracing::warn!(
                        "⚠️ Failed to remove cron job for '{}': {}",
                        workflow_id,
                        e
                    );
                }
                tracing::info!("🗑️ Unscheduled workflow '{}'", workflow_id);
            }
            None => {
                tracing::debug!("Unschedule for '{}' ignored: no active binding", workflow_id);
            }
        }
    }

    /// One scheduled fire: reload, skip benign races, run the engine
    ///
    /// A missing or deactivated workflow is not an error; the binding simply
    /// skips until it is removed.
    pub async fn execute_scheduled(&self, workflow_id: &str) -> Result<()> {
        fire(&self.workflows, &self.executions, &self.engine, workflow_id).await
    }

    /// Stop all timers and clear all bindings; safe to call repeatedly
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut bindings = self.bindings.write().await;
            bindings.clear();
        }

        {
            let mut scheduler = self.scheduler.write().await;
            if let Err(e) = scheduler.shutdown().await {
                // Already stopped on a repeated shutdown; nothing to do.
                tracing::debug!("Scheduler shutdown reported: {}", e);
            }
        }

        tracing::info!("⏹️ Scheduler stopped");
        Ok(())
    }

    /// Ids of workflows with an active binding
    pub async fn scheduled_workflow_ids(&self) -> Vec<String> {
        self.bindings.read().await.keys().cloned().collect()
    }

    /// The cron expression currently bound to `workflow_id`, if any
    pub async fn schedule_for(&self, workflow_id: &str) -> Option<String> {
        self.bindings
            .read()
            .await
            .get(workflow_id)
            .map(|binding| binding.cron.clone())
    }
}

/// Body of one scheduled fire, shared between the job closure and
/// `execute_scheduled`
async fn fire(
    workflows: &Arc<dyn WorkflowStore>,
    executions: &Arc<dyn ExecutionStore>,
    engine: &Arc<ExecutionEngine>,
    workflow_id: &str,
) -> Result<()> {
    let stored = match workflows.get_workflow(workflow_id).await? {
        Some(stored) => stored,
        None => {
            tracing::debug!("⏭️ Skipping fire for deleted workflow '{}'", workflow_id);
            return Ok(());
        }
    };

    if !stored.is_active {
        tracing::debug!("⏭️ Skipping fire for deactivated workflow '{}'", workflow_id);
        return Ok(());
    }

    let execution = executions
        .create_execution(workflow_id, json!({"triggeredBy": "scheduler"}))
        .await?;

    tracing::info!(
        "🚀 Scheduled run of workflow '{}' as execution {}",
        workflow_id,
        execution.id
    );

    engine.run_workflow(&stored.workflow, &execution.id).await
}
