use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tokio::net::TcpListener;

use webhook_tap::config::Config;
use webhook_tap::error::AppError;
use webhook_tap::server;
use webhook_tap::store::LogStore;
use webhook_tap::tunnel::TunnelSupervisor;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::load(Path::new(".env"))?;

    // The provider allows one session per account, so clear any session
    // tracked by this supervisor before starting a fresh one.
    let mut tunnel = TunnelSupervisor::new(&config);
    tunnel.stop().await;
    let url = tunnel.start().await?;
    tracing::info!(url, "public URL ready");

    let store = LogStore::new(config.log_dir.clone());
    let app = server::router(store.clone());

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "HTTP server listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    store.ensure_today_file()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");

    // Bounded grace period; handlers still running afterwards are abandoned.
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(Duration::from_secs(5), server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "server task failed"),
        Err(_) => tracing::warn!("graceful shutdown timed out"),
    }

    tunnel.stop().await;
    tracing::info!("server exiting");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
