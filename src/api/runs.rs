/// Run-now and execution polling endpoints
///
/// "Run now" is fire-and-forget: the response carries the execution id while
/// the graph runs on its own task. The execution record is the sole error
/// channel; callers poll it instead of expecting a synchronous failure.

use crate::workflow::storage::{ExecutionStore, WorkflowStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::AppState;

/// Optional trigger context supplied by the caller
#[derive(Debug, Default, Deserialize)]
pub struct RunNowRequest {
    #[serde(default)]
    pub input: Option<Value>,
}

/// Create run-trigger and execution polling routes
pub fn create_run_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows/{id}/run", post(run_workflow_now))
        .route("/api/workflows/{id}/executions", get(list_executions))
        .route("/api/executions/{id}", get(get_execution))
}

/// Trigger a workflow immediately, bypassing the scheduler
///
/// POST /api/workflows/:id/run
/// Returns 202 with the execution id; poll GET /api/executions/:id.
async fn run_workflow_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<RunNowRequest>>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let stored = match state.storage.get_workflow(&id).await {
        Ok(Some(stored)) => stored,
        Ok(None) => return Err(not_found("workflow not found")),
        Err(e) => return Err(internal(&e)),
    };

    // Caller-supplied input, with the trigger source stamped on top.
    let mut input = match payload.and_then(|Json(req)| req.input) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
        None => Map::new(),
    };
    input.insert("triggeredBy".to_string(), json!("manual"));

    let execution = state
        .engine
        .start_run(stored.workflow, Value::Object(input))
        .await
        .map_err(|e| internal(&e))?;

    tracing::info!("🚀 Manual run of workflow '{}' as execution {}", id, execution.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "executionId": execution.id,
            "status": execution.status,
        })),
    ))
}

/// Recent executions of one workflow
///
/// GET /api/workflows/:id/executions
async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.list_executions(&id, 50).await {
        Ok(executions) => Ok(Json(json!({ "executions": executions }))),
        Err(e) => {
            tracing::error!("Failed to list executions for {}: {}", id, e);
            Err(internal(&e))
        }
    }
}

/// One execution record, including output or error once terminal
///
/// GET /api/executions/:id
async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.storage.get_execution(&id).await {
        Ok(Some(execution)) => Ok(Json(serde_json::to_value(execution).map_err(|e| {
            internal(&anyhow::anyhow!(e))
        })?)),
        Ok(None) => Err(not_found("execution not found")),
        Err(e) => {
            tracing::error!("Failed to get execution {}: {}", id, e);
            Err(internal(&e))
        }
    }
}

fn not_found(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

fn internal(error: &anyhow::Error) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": error.to_string() })),
    )
}
