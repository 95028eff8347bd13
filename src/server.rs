/// Server setup and initialization
///
/// Wires together all components: storage, node executor, execution engine,
/// scheduler, and HTTP routes. The scheduler instance is constructed here
/// once and handed to every consumer by reference; there is no global
/// scheduler state anywhere.

use crate::{
    api::{runs::create_run_routes, workflows::create_workflow_routes, AppState},
    config::Config,
    notify::{NotifierRegistry, WebhookNotifier},
    runtime::{engine::ExecutionEngine, executor::NodeExecutor, scheduler::WorkflowScheduler},
    workflow::storage::WorkflowStorage,
};
use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Create the main Axum application with all routes wired
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("📁 Ensuring data directory exists: {}", config.database.data_dir);
    std::fs::create_dir_all(&config.database.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory: {}", e))?;

    let db_path = Path::new(&config.database.data_dir).join("workloom.db");
    tracing::info!("🗄️ Opening database: {}", db_path.display());
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    let storage = WorkflowStorage::new(pool);
    storage.init_schema().await?;

    tracing::info!("📣 Building notifier registry");
    let mut notifiers = NotifierRegistry::new();
    if let Some(url) = &config.notifiers.slack_webhook_url {
        notifiers.register("slack", Arc::new(WebhookNotifier::new(url.clone())));
    }
    if let Some(url) = &config.notifiers.discord_webhook_url {
        notifiers.register("discord", Arc::new(WebhookNotifier::new(url.clone())));
    }
    if notifiers.is_empty() {
        tracing::info!("📣 No notifiers configured; messaging nodes will simulate sends");
    }

    tracing::info!("⚙️ Initializing node executor");
    let executor = Arc::new(NodeExecutor::new(Arc::new(notifiers)));

    tracing::info!("🚀 Initializing execution engine");
    let engine = Arc::new(ExecutionEngine::new(
        executor,
        Arc::new(storage.clone()),
    ));

    tracing::info!("⏰ Initializing workflow scheduler");
    let scheduler = Arc::new(
        WorkflowScheduler::new(
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            Arc::clone(&engine),
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize scheduler: {}", e))?,
    );

    // Rebuild bindings from stored schedules and start the timer loop.
    scheduler
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start scheduler: {}", e))?;

    let app_state = AppState {
        storage,
        scheduler,
        engine,
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = Router::new()
        .route("/healthz", get(health_check))
        .merge(create_workflow_routes().with_state(app_state.clone()))
        .merge(create_run_routes().with_state(app_state));

    tracing::info!("✅ Application initialized successfully");

    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting workloom server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
