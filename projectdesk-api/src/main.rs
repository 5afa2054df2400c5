//! # ProjectDesk API Server
//!
//! REST backend for ProjectDesk: projects, tasks with budget roll-up, time
//! logs, project teams and task comments.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/projectdesk \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p projectdesk-api
//! ```
//!
//! See `config` for every setting.

use anyhow::Context;
use projectdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use projectdesk_shared::db::{
    migrations::{migration_status, run_migrations},
    pool::{close_pool, create_pool},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "projectdesk_api=debug,projectdesk_shared=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(config.log.json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "ProjectDesk API server starting"
    );

    let db = create_pool(config.pool_config())
        .await
        .context("failed to connect to the database")?;

    if config.database.run_migrations {
        run_migrations(&db).await.context("failed to run migrations")?;
    }

    let status = migration_status(&db).await?;
    if !status.is_up_to_date() {
        tracing::warn!(
            applied = status.applied,
            embedded = status.embedded,
            "Database schema is behind this build"
        );
    }

    let address = config.bind_address();
    let state = AppState::new(db.clone(), config);
    let app = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
