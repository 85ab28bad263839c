use std::sync::Arc;
use std::time::Duration;

use studytrack::ai::{DisabledGenerator, GeminiClient, TextGenerator};
use studytrack::core::{AppState, Config, database};
use studytrack::monitoring::spawn_process_monitor;
use studytrack::storage::FileStorage;
use studytrack::create_router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,studytrack=debug")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    config.log_summary();

    info!("Connecting to database...");
    let pool = database::connect(&config).await?;

    info!("Initializing storage...");
    let storage = FileStorage::from_config(&config).await?;

    let ai: Arc<dyn TextGenerator> = match &config.gemini_api_key {
        Some(key) => Arc::new(GeminiClient::new(
            key.clone(),
            config.gemini_model.clone(),
            config.gemini_api_base.clone(),
        )?),
        None => {
            warn!("GEMINI_API_KEY not set, AI routes will answer 503");
            Arc::new(DisabledGenerator)
        }
    };

    if config.monitor_interval_secs > 0 {
        spawn_process_monitor(Duration::from_secs(config.monitor_interval_secs));
    }

    let address = format!("{}:{}", config.server_host, config.server_port);
    let state = Arc::new(AppState::new(pool.clone(), storage, ai, config));
    let app = create_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
