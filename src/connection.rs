//! A single accepted TCP connection: the per-connection byte buffer, frame
//! codec driving, read/write task split, and the cheap, cloneable
//! [`ConnectionHandle`] the event manager and session layer use to address
//! it without holding the socket itself.
//!
//! Grounded in the teacher's `ws_forwarder.rs` connection loop (one task per
//! connection, `tokio::select!` over socket and command channel) and the
//! example pack's raw-TCP `sqrldb` server (`TcpStream::into_split`, a
//! `BufReader`/`BufWriter` half each, an outbound `mpsc` channel drained by a
//! dedicated writer task).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gabp_protocol::{FrameCodec, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::Session;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A cheap, `Clone`-able reference to a connection's outbound channel and
/// liveness flag. This is what gets stored in tool/event subscriber tables —
/// never the socket itself.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: Arc<str>,
    outbound: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl ConnectionHandle {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the connection's write side is still believed open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Enqueues `message` for the writer task. Returns `false` if the
    /// connection has already gone away (the receiver was dropped).
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Builds a handle with no backing socket, for unit tests that exercise
    /// the tool/event registries without a real connection.
    #[cfg(test)]
    #[must_use]
    pub fn for_test(id: &str) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Arc::from(id),
            outbound: tx,
            connected: Arc::new(AtomicBool::new(true)),
        };
        (handle, rx)
    }
}

/// Drives one accepted socket end to end: handshake-or-not dispatch, frame
/// decode, and outbound serialization, until disconnect or an unrecoverable
/// framing error.
pub async fn handle_connection(
    stream: TcpStream,
    connection_id: String,
    server: Arc<crate::server::GabpServerInner>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let connected = Arc::new(AtomicBool::new(true));

    let handle = ConnectionHandle {
        id: Arc::from(connection_id.as_str()),
        outbound: outbound_tx,
        connected: Arc::clone(&connected),
    };

    server
        .connections
        .write()
        .await
        .insert(connection_id.clone(), handle.clone());

    let writer_connected = Arc::clone(&connected);
    let writer_task = tokio::spawn(run_writer(write_half, outbound_rx, writer_connected));

    let mut session = Session::new(connection_id.clone());
    run_reader(read_half, &mut session, &handle, &server, &mut shutdown).await;

    connected.store(false, Ordering::SeqCst);
    server.connections.write().await.remove(&connection_id);
    server.events.on_disconnect(&connection_id).await;
    drop(handle);

    // Every clone of the outbound sender has now been dropped (the local
    // handle, the connection table entry, and any event-channel
    // subscriptions), so the writer task's `recv()` returns `None` and it
    // exits on its own — no forced abort needed.
    let _ = writer_task.await;
    debug!(connection_id = %connection_id, "connection closed");
}

async fn run_reader(
    mut read_half: OwnedReadHalf,
    session: &mut Session,
    handle: &ConnectionHandle,
    server: &Arc<crate::server::GabpServerInner>,
    shutdown: &mut tokio::sync::watch::Receiver<bool>,
) {
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
            read_result = read_half.read(&mut chunk) => {
                match read_result {
                    Ok(0) => return,
                    Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                    Err(err) => {
                        warn!(connection_id = handle.id(), error = %err, "read error, closing connection");
                        return;
                    }
                }
            }
        }

        loop {
            match FrameCodec::decode_next(&mut buffer) {
                Ok(Some(payload)) => {
                    let message: Message = match serde_json::from_slice(&payload) {
                        Ok(message) => message,
                        Err(err) => {
                            warn!(connection_id = handle.id(), error = %err, "dropping malformed frame payload");
                            continue;
                        }
                    };
                    if let Some(response) = crate::session::dispatch(session, message, server).await {
                        let _ = handle.send(response);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(connection_id = handle.id(), error = %err, "malformed frame header, closing connection");
                    return;
                }
            }
        }
    }
}

async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    connected: Arc<AtomicBool>,
) {
    while let Some(message) = outbound_rx.recv().await {
        let Ok(payload) = serde_json::to_vec(&message) else {
            continue;
        };
        let frame = FrameCodec::encode(&payload);
        if let Err(err) = write_half.write_all(&frame).await {
            warn!(error = %err, "write error, closing connection");
            break;
        }
        if write_half.flush().await.is_err() {
            break;
        }
    }
    connected.store(false, Ordering::SeqCst);
}
