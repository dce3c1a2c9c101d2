//! # Taskboard API Server
//!
//! Serves boards, ordered lists and tasks over JSON.
//!
//! ## Storage
//!
//! With `DATABASE_URL` set the server runs pending migrations and uses
//! PostgreSQL; without it, everything lives in memory and is lost on exit.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p taskboard-api
//! ```

use taskboard_api::{app, config::Config};
use taskboard_shared::db::{migrations, pool};
use taskboard_shared::repository::Repositories;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskboard API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let (repos, db_pool) = match &config.database {
        Some(database) => {
            if let Err(e) = migrations::ensure_database_exists(&database.url).await {
                tracing::warn!(error = %e, "Could not ensure database exists, continuing");
            }

            let db_pool = pool::create_pool(database.pool_config()).await?;
            migrations::run_migrations(&db_pool).await?;

            let status = migrations::get_migration_status(&db_pool).await?;
            tracing::info!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                up_to_date = status.is_up_to_date,
                "Database schema ready"
            );

            (Repositories::postgres(db_pool.clone()), Some(db_pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            (Repositories::in_memory(), None)
        }
    };

    if let Some(db_pool) = &db_pool {
        let stats = pool::get_pool_stats(db_pool);
        tracing::debug!(
            total = stats.total_connections,
            idle = stats.idle_connections,
            "Connection pool stats"
        );
    }

    let bind_address = config.bind_address();
    let state = app::AppState::new(repos, config);
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db_pool) = db_pool {
        pool::close_pool(db_pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
