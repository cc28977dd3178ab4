//! Serve command: run the HTTP adapter until Ctrl+C / SIGTERM

use anyhow::{Context, Result};
use tracing::info;

use points_ledger::config::Config;
use points_ledger::ledger::LedgerDb;
use points_ledger::server::{HttpServer, Router};
use points_ledger::service::ProgressionService;

pub async fn serve_command(config: &Config) -> Result<()> {
    let calendar = config.calendar()?;
    let db_path = config.database_path();
    let db = LedgerDb::open(&db_path)?;
    let service = ProgressionService::from_db(&db, calendar);

    let token = Some(config.auth.gateway_token.clone());
    let server = HttpServer::start(&config.server, Router::new(service, token))?;
    info!(
        "[points:http] Serving ledger {} (calendar offset {})",
        db_path.display(),
        calendar.offset()
    );

    shutdown_signal().await;
    info!("[points:http] Shutdown requested");

    tokio::task::spawn_blocking(move || server.shutdown())
        .await
        .context("Failed to join server shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
