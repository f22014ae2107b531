use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pharma_tracker::api;
use pharma_tracker::config::{Config, LogFormat};
use pharma_tracker::engine::directory;
use pharma_tracker::error::AppError;
use pharma_tracker::external::Collaborators;
use pharma_tracker::state::{AppState, StateOptions};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let collaborators = Collaborators::from_config(&config)
        .map_err(|err| AppError::Internal(format!("invalid collaborator config: {err}")))?;
    let app_state = AppState::new(collaborators, StateOptions::from_config(&config))?;
    if let Some(admin_id) = &config.bootstrap_admin_id {
        directory::bootstrap_admin(&app_state, admin_id)?;
        tracing::info!(user_id = %admin_id, "bootstrap administrator ready");
    }
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        app_env = %config.app_env,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
