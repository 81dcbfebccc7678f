mod config;
mod engine;
mod errors;
mod models;
mod risk;
mod server;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("gbm_var starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        max_ensemble_values = cfg.max_ensemble_values,
        timeout_secs = cfg.simulation_timeout.as_secs(),
        seeded = cfg.simulation_seed.is_some(),
        frontend = %cfg.frontend_dir.display(),
        "configuration loaded"
    );

    let port = cfg.server_port;
    let app = server::build_router(AppState::new(cfg));

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error: {}", errors::EngineError::from(e));
            std::process::exit(1);
        }
    };

    tracing::info!("server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
