mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirpy_api::auth::{AppState, AppStateInner};
use chirpy_auth::SessionConfig;
use chirpy_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirpy=debug,chirpy_api=debug,chirpy_auth=debug,chirpy_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let addr = config.addr()?;

    // Init database
    let db = Database::open(&config.db_path, config.debug).context("error with database initialization")?;

    let state: AppState = Arc::new(AppStateInner::new(
        Arc::new(db),
        &config.jwt_secret,
        &config.polka_key,
        SessionConfig::default(),
    ));

    let app = chirpy_api::router(state, &config.file_root)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Chirpy listening on {}", addr);
    info!("Serving files from {}", config.file_root.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
