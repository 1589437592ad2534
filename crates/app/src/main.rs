mod attendance;
mod companies;
mod error;
mod meetings;
mod participants;
mod problem;
mod router;
mod scope;
mod telemetry;
#[cfg(test)]
mod testing;
mod topics;
mod voting;

use std::net::SocketAddr;

use govreg_storage::Database;
use govreg_util::{load_env_file, AppConfig};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let storage =
        Database::connect_with(&config.database_url, config.database_max_connections).await?;
    storage.run_migrations().await?;
    info!(stage = "app", database = %config.database_url, "database ready");

    let state = router::AppState::new(metrics, storage.clone());

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.pool().close().await;
    info!(stage = "app", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(stage = "app", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!(stage = "app", "received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(stage = "app", "received SIGTERM, shutting down");
            }
            Err(err) => {
                warn!(stage = "app", error = %err, "failed to install SIGTERM handler");
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
