//! Clinova API server

use std::time::Duration;

use anyhow::Context;
use clinova_api::{config::Config, routes::create_router, state::AppState};
use clinova_shared::{create_pool, run_migrations};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clinova_api=info,clinova_plans=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let state = AppState::new(config, pool);

    // Periodic sweep keeps expired usage entries from accumulating for
    // clinics that stop making requests.
    let sweep_state = state.clone();
    let sweep_interval = Duration::from_secs(state.config.cache_sweep_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            sweep_state.plans.sweep_caches();
            tracing::debug!("usage cache sweep complete");
        }
    });

    let bind_address = state.config.bind_address.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    tracing::info!("Clinova API listening on {}", bind_address);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
