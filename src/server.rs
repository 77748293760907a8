//! Accept loop (C10, ambient): binds the listening socket, spawns one
//! task per accepted connection, and stops cleanly on Ctrl+C/SIGTERM.

use crate::config::ServerConfig;
use crate::connection;
use tokio::net::TcpListener;
use tokio::signal;

pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, root = %config.document_root, "server listening");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        let config = config.clone();
                        let timeout = std::time::Duration::from_secs(config.connection_timeout);
                        tokio::spawn(async move {
                            if tokio::time::timeout(timeout, connection::handle(stream, config))
                                .await
                                .is_err()
                            {
                                tracing::warn!(%peer, "connection timed out");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                    }
                }
            }
            _ = shutdown_signal() => {
                tracing::info!("shutdown signal received, stopping server");
                break;
            }
        }
    }

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
