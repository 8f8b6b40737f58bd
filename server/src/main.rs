mod config;
mod db;
mod domain;
mod frame;
mod routes;
mod services;
mod state;

use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// How often idle table sessions are swept from memory.
const TABLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How often expired owner sessions and socket tickets are purged.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let google = services::oauth::GoogleConfig::from_env();
    if google.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set; Google sign-in disabled");
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.upload_dir).await {
        tracing::warn!(error = %e, dir = %config.upload_dir.display(), "upload directory not writable");
    }

    let port = config.port;
    let state = state::AppState::new(pool, config, google);

    let _sweeper = services::table_session::spawn_sweeper(state.tables.clone(), TABLE_SWEEP_INTERVAL);
    let _purge = services::session::spawn_purge_task(state.pool.clone(), SESSION_PURGE_INTERVAL);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "tableside listening");
    axum::serve(listener, app).await.expect("server failed");
}
