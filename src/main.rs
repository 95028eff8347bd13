/// Workloom: workflow automation runtime
///
/// Main entry point for the workloom server. Initializes configuration and
/// starts the HTTP server with workflow management, scheduling, and
/// execution capabilities.

use workloom::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Schedule management at /api/workflows/{id}/schedule
/// - Run-now trigger at /api/workflows/{id}/run
/// - Execution polling at /api/executions/{id}
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3007 and a SQLite database)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
