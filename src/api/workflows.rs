/// Workflow management REST API endpoints
///
/// CRUD for workflow definitions plus schedule management. Schedule changes
/// bind on the live scheduler first (the step that can reject) and are then
/// persisted, so a restart reconstructs the same bindings.

use crate::{
    runtime::scheduler::{ScheduleError, WorkflowScheduler},
    workflow::{
        storage::{WorkflowStorage, WorkflowStore},
        types::Workflow,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow creation and update
#[derive(Debug, Deserialize)]
pub struct SaveWorkflowRequest {
    pub workflow: Workflow,
    /// Optional 5-field cron expression applied on creation
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Request body for schedule management
#[derive(Debug, Deserialize)]
pub struct SetScheduleRequest {
    /// Standard 5-field cron expression (minute hour day month weekday)
    pub cron: String,
}

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", put(update_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
        .route("/api/workflows/{id}/schedule", put(set_schedule))
        .route("/api/workflows/{id}/schedule", delete(clear_schedule))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": {...}, "schedule": "*/5 * * * *"? }
async fn create_workflow(
    State(state): State<AppState>,
    Json(payload): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, (StatusCode, Json<Value>)> {
    let workflow = payload.workflow;

    if workflow.id.is_empty() || workflow.name.is_empty() {
        return Err(bad_request("workflow id and name are required"));
    }

    match state.storage.get_workflow(&workflow.id).await {
        Ok(Some(_)) => return Err(conflict("workflow already exists")),
        Ok(None) => {}
        Err(e) => return Err(internal(&e)),
    }

    if let Err(e) = state.storage.save_workflow(&workflow).await {
        tracing::error!("Failed to save workflow: {}", e);
        return Err(internal(&e));
    }

    if let Some(cron) = payload.schedule {
        apply_schedule(&state.storage, &state.scheduler, &workflow.id, &cron).await?;
    }

    tracing::info!("📝 Created workflow: {} ({})", workflow.id, workflow.name);

    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' created successfully", workflow.name),
    }))
}

/// List all workflows
///
/// GET /api/workflows
async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "workflows": workflows }))),
        Err(e) => {
            tracing::error!("Failed to list workflows: {}", e);
            Err(internal(&e))
        }
    }
}

/// Get a specific workflow by ID, with its activation and schedule state
///
/// GET /api/workflows/:id
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.get_workflow(&id).await {
        Ok(Some(stored)) => Ok(Json(json!({
            "workflow": stored.workflow,
            "isActive": stored.is_active,
            "schedule": stored.schedule,
        }))),
        Ok(None) => Err(not_found()),
        Err(e) => {
            tracing::error!("Failed to get workflow {}: {}", id, e);
            Err(internal(&e))
        }
    }
}

/// Update an existing workflow definition
///
/// PUT /api/workflows/:id
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SaveWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, (StatusCode, Json<Value>)> {
    let mut workflow = payload.workflow;
    workflow.id = id.clone();

    if workflow.name.is_empty() {
        return Err(bad_request("workflow name is required"));
    }

    match state.storage.get_workflow(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found()),
        Err(e) => return Err(internal(&e)),
    }

    if let Err(e) = state.storage.save_workflow(&workflow).await {
        tracing::error!("Failed to update workflow: {}", e);
        return Err(internal(&e));
    }

    tracing::info!("📝 Updated workflow: {} ({})", workflow.id, workflow.name);

    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' updated successfully", workflow.name),
    }))
}

/// Delete a workflow and drop any active schedule binding
///
/// DELETE /api/workflows/:id
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.scheduler.unschedule_workflow(&id).await;

    match state.storage.delete_workflow(&id).await {
        Ok(true) => {
            tracing::info!("🗑️ Deleted workflow: {}", id);
            Ok(Json(json!({ "message": "Workflow deleted successfully" })))
        }
        Ok(false) => Err(not_found()),
        Err(e) => {
            tracing::error!("Failed to delete workflow: {}", e);
            Err(internal(&e))
        }
    }
}

/// Set or replace a workflow's cron schedule
///
/// PUT /api/workflows/:id/schedule
/// Body: { "cron": "*/5 * * * *" }
async fn set_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SetScheduleRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.get_workflow(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found()),
        Err(e) => return Err(internal(&e)),
    }

    apply_schedule(&state.storage, &state.scheduler, &id, &payload.cron).await?;

    Ok(Json(json!({
        "message": "Schedule updated",
        "cron": payload.cron,
    })))
}

/// Clear a workflow's schedule and stop its timer
///
/// DELETE /api/workflows/:id/schedule
async fn clear_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.set_schedule(&id, None).await {
        Ok(true) => {}
        Ok(false) => return Err(not_found()),
        Err(e) => return Err(internal(&e)),
    }

    state.scheduler.unschedule_workflow(&id).await;

    Ok(Json(json!({ "message": "Schedule cleared" })))
}

/// Validate + bind the schedule first, then persist it
///
/// Scheduling is the step that can reject (invalid cron); doing it before the
/// storage write keeps a rejected expression out of the schedule column.
async fn apply_schedule(
    storage: &WorkflowStorage,
    scheduler: &Arc<WorkflowScheduler>,
    workflow_id: &str,
    cron: &str,
) -> Result<(), (StatusCode, Json<Value>)> {
    match scheduler.schedule_workflow(workflow_id, cron).await {
        Ok(()) => {}
        Err(e @ ScheduleError::InvalidCron { .. }) => {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            ));
        }
        Err(e) => {
            tracing::error!("Failed to schedule workflow {}: {}", workflow_id, e);
            return Err(internal(&anyhow::anyhow!(e)));
        }
    }

    if let Err(e) = storage.set_schedule(workflow_id, Some(cron)).await {
        tracing::error!("Failed to persist schedule for {}: {}", workflow_id, e);
        return Err(internal(&e));
    }

    Ok(())
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn conflict(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "workflow not found" })),
    )
}

fn internal(error: &anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.to_string() })),
    )
}
