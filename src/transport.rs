//! Loopback TCP accept loop (`spec.md` §4.3).

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use crate::connection::handle_connection;
use crate::server::GabpServerInner;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Runs until `shutdown` is signalled or the listener is closed out from
/// under it. Each accepted socket is handed to its own connection task,
/// tracked in a [`JoinSet`] so finished connections are reaped as they
/// complete rather than accumulating for the lifetime of the server; on
/// shutdown this function does not return until every spawned connection
/// task has finished (each observes `shutdown` itself and exits promptly).
pub(crate) async fn run_accept_loop(
    listener: TcpListener,
    server: Arc<GabpServerInner>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    info!(port = listener.local_addr().map(|a| a.port()).unwrap_or(0), "accept loop started");
    let mut connections: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("accept loop shutting down");
                    break;
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let connection_id = Uuid::new_v4().to_string();
                        info!(connection_id = %connection_id, peer = %peer, "connection established");
                        let server = Arc::clone(&server);
                        let shutdown = shutdown.clone();
                        connections.spawn(handle_connection(stream, connection_id, server, shutdown));
                    }
                    Err(err) => {
                        error!(error = %err, "accept failed, backing off");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    while connections.join_next().await.is_some() {}
}
