mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::hub::Hub;
use services::store::{BlockStore, SqlBlockStore};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to read .env: {e}");
        }
    }
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    let store: Arc<dyn BlockStore> = Arc::new(SqlBlockStore::new(pool.clone()));
    services::store::seed_defaults(store.as_ref())
        .await
        .expect("seeding default blocks failed");

    let hub = Hub::load(store).await.expect("loading blocks failed");
    let (hub_handle, _hub_task) = hub.spawn(config.hub_queue_capacity);

    let state = state::AppState::new(hub_handle, config.client_queue_capacity);
    let app = routes::app(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, static_dir = %config.static_dir, "blockboard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    pool.close().await;
    tracing::info!("database closed; bye");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
