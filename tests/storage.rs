//! SQLite storage integration tests over an in-memory database.

use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use workloom::workflow::storage::{ExecutionStore, WorkflowStorage, WorkflowStore};
use workloom::workflow::types::{Edge, ExecutionStatus, Node, NodeType, Workflow};

async fn storage() -> WorkflowStorage {
    // Single connection: every pooled connection to :memory: is a distinct db.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let storage = WorkflowStorage::new(pool);
    storage.init_schema().await.unwrap();
    storage
}

fn sample_workflow(id: &str) -> Workflow {
    Workflow {
        id: id.to_string(),
        name: format!("{id} name"),
        nodes: vec![
            Node {
                id: "t".to_string(),
                node_type: NodeType::Trigger,
                title: "Start".to_string(),
                config: Value::Null,
            },
            Node {
                id: "a".to_string(),
                node_type: NodeType::Action,
                title: "Do".to_string(),
                config: json!({"action": "do"}),
            },
        ],
        edges: vec![Edge {
            from: "t".to_string(),
            to: "a".to_string(),
        }],
    }
}

#[tokio::test]
async fn workflow_round_trips_with_default_activation_state() {
    let storage = storage().await;
    storage.save_workflow(&sample_workflow("wf")).await.unwrap();

    let stored = storage.get_workflow("wf").await.unwrap().unwrap();
    assert_eq!(stored.workflow.id, "wf");
    assert_eq!(stored.workflow.nodes.len(), 2);
    assert_eq!(stored.workflow.edges.len(), 1);
    assert!(stored.is_active);
    assert_eq!(stored.schedule, None);
}

#[tokio::test]
async fn upsert_preserves_schedule_and_activation() {
    let storage = storage().await;
    storage.save_workflow(&sample_workflow("wf")).await.unwrap();
    assert!(storage.set_schedule("wf", Some("*/5 * * * *")).await.unwrap());
    assert!(storage.set_active("wf", false).await.unwrap());

    // Re-saving the definition must not clobber schedule/activation.
    storage.save_workflow(&sample_workflow("wf")).await.unwrap();

    let stored = storage.get_workflow("wf").await.unwrap().unwrap();
    assert_eq!(stored.schedule.as_deref(), Some("*/5 * * * *"));
    assert!(!stored.is_active);
}

#[tokio::test]
async fn list_active_scheduled_filters_inactive_and_unscheduled() {
    let storage = storage().await;
    for id in ["a", "b", "c"] {
        storage.save_workflow(&sample_workflow(id)).await.unwrap();
    }
    storage.set_schedule("a", Some("0 9 * * 1")).await.unwrap();
    storage.set_schedule("b", Some("*/5 * * * *")).await.unwrap();
    storage.set_active("b", false).await.unwrap();

    let mut scheduled = storage.list_active_scheduled().await.unwrap();
    scheduled.sort_by(|x, y| x.id.cmp(&y.id));

    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, "a");
    assert_eq!(scheduled[0].schedule, "0 9 * * 1");
}

#[tokio::test]
async fn set_schedule_on_unknown_workflow_reports_no_rows() {
    let storage = storage().await;
    assert!(!storage.set_schedule("ghost", Some("* * * * *")).await.unwrap());
}

#[tokio::test]
async fn execution_lifecycle_round_trips() {
    let storage = storage().await;

    let created = storage
        .create_execution("wf", json!({"triggeredBy": "manual"}))
        .await
        .unwrap();
    assert_eq!(created.status, ExecutionStatus::Running);

    let fetched = storage.get_execution(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ExecutionStatus::Running);
    assert_eq!(fetched.input, json!({"triggeredBy": "manual"}));
    assert!(fetched.output.is_none());
    assert!(fetched.completed_at.is_none());

    storage
        .update_execution(
            &created.id,
            ExecutionStatus::Completed,
            Some(json!({"triggered": true, "children": []})),
            None,
        )
        .await
        .unwrap();

    let fetched = storage.get_execution(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ExecutionStatus::Completed);
    assert_eq!(fetched.output.unwrap()["triggered"], json!(true));
    assert!(fetched.error.is_none());
    assert!(fetched.completed_at.is_some());
}

#[tokio::test]
async fn failed_execution_records_error_without_output() {
    let storage = storage().await;
    let created = storage.create_execution("wf", json!({})).await.unwrap();

    storage
        .update_execution(
            &created.id,
            ExecutionStatus::Failed,
            None,
            Some("no trigger node found".to_string()),
        )
        .await
        .unwrap();

    let fetched = storage.get_execution(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ExecutionStatus::Failed);
    assert_eq!(fetched.error.as_deref(), Some("no trigger node found"));
    assert!(fetched.output.is_none());
}

#[tokio::test]
async fn list_executions_returns_newest_first_with_limit() {
    let storage = storage().await;
    for _ in 0..3 {
        storage.create_execution("wf", json!({})).await.unwrap();
    }
    storage.create_execution("other", json!({})).await.unwrap();

    let executions = storage.list_executions("wf", 2).await.unwrap();
    assert_eq!(executions.len(), 2);
    assert!(executions.iter().all(|e| e.workflow_id == "wf"));
    assert!(executions[0].started_at >= executions[1].started_at);
}
