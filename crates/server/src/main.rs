mod seed;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use api::{router, AppState};
use cakehouse_core::{run_migrations, AppConfig, Database};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (config, overrides) = AppConfig::load_with_env().context("Failed to load configuration")?;
    telemetry::init(&config.telemetry);

    if !overrides.is_empty() {
        info!(keys = ?overrides, "Configuration overridden from environment");
    }

    let db = Database::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;

    let applied = run_migrations(&db).await.context("Failed to run migrations")?;
    if applied > 0 {
        info!(applied, "Migrations applied");
    }

    let state = Arc::new(AppState::from_config(db.clone(), &config.auth));
    seed::seed_admin(&state.users, &config.seed).await?;

    let app = router::router(state, &config.cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Cake House API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
