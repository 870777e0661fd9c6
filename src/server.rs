//! The server facade: wires the tool registry, event manager, connection
//! table, and transport together; exposes `start`/`stop` (`spec.md` §4.7).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::info;

use crate::config::GabpConfig;
use crate::connection::ConnectionHandle;
use crate::error::ServerError;
use crate::events::EventManager;
use crate::tool::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FacadeState {
    Created,
    Running,
    Stopped,
}

/// The shared state handed to every connection task. Kept separate from
/// [`GabpServer`] so connection tasks can hold an `Arc` to just this part
/// without the `start`/`stop` bookkeeping.
pub struct GabpServerInner {
    pub config: GabpConfig,
    pub tools: Arc<ToolRegistry>,
    pub events: Arc<EventManager>,
    pub connections: RwLock<HashMap<String, ConnectionHandle>>,
}

/// `CREATED → RUNNING → STOPPED`. `start` is rejected once already running;
/// `stop` is idempotent.
pub struct GabpServer {
    inner: Arc<GabpServerInner>,
    state: Mutex<FacadeState>,
    port: AtomicU16,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl GabpServer {
    /// Builds a server in the `CREATED` state. The built-in channels
    /// (`system/status`, `system/log`) are registered by [`Self::start`],
    /// not here — construction stays synchronous and side-effect-free.
    #[must_use]
    pub fn new(config: GabpConfig) -> Self {
        let events = Arc::new(EventManager::new());
        let tools = Arc::new(ToolRegistry::new());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(GabpServerInner {
                config,
                tools,
                events,
                connections: RwLock::new(HashMap::new()),
            }),
            state: Mutex::new(FacadeState::Created),
            port: AtomicU16::new(0),
            shutdown_tx,
            accept_task: Mutex::new(None),
        }
    }

    /// Registers the built-in channels (`system/status`, `system/log`).
    /// Called unconditionally from [`Self::start`] — kept as its own method
    /// (rather than inlined) only so tests and `start` share one definition.
    async fn register_builtin_channels(&self) {
        self.inner
            .events
            .register_channel("system/status", Some("System status events".to_owned()))
            .await;
        self.inner
            .events
            .register_channel("system/log", Some("System log events".to_owned()))
            .await;
    }

    #[must_use]
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.inner.tools
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventManager> {
        &self.inner.events
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.inner.config.token
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    /// Registers the built-in channels, binds the loopback listener, and
    /// spawns the accept loop. The built-ins are registered here
    /// unconditionally — `spec.md` §4.7 requires them present for every
    /// running server, not just ones whose caller remembers an extra step.
    pub async fn start(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().await;
        if *state != FacadeState::Created {
            return Err(ServerError::AlreadyRunning);
        }

        self.register_builtin_channels().await;

        let addr = format!("127.0.0.1:{}", self.inner.config.port);
        let listener = TcpListener::bind(&addr).await.map_err(ServerError::Bind)?;
        let assigned_port = listener.local_addr().map_err(ServerError::Bind)?.port();
        self.port.store(assigned_port, Ordering::SeqCst);

        info!(port = assigned_port, "gabp server listening");

        let inner = Arc::clone(&self.inner);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let task = tokio::spawn(crate::transport::run_accept_loop(listener, inner, shutdown_rx));
        *self.accept_task.lock().await = Some(task);

        *state = FacadeState::Running;
        Ok(())
    }

    /// Idempotent. Signals shutdown, waits for the accept loop to exit, and
    /// closes the connection table. Already-`Stopped` or never-`start`ed
    /// servers return immediately.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if *state != FacadeState::Running {
            *state = FacadeState::Stopped;
            return;
        }

        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.accept_task.lock().await.take() {
            // The accept loop only returns after every spawned connection
            // task has itself observed `shutdown` and finished.
            let _ = task.await;
        }

        *state = FacadeState::Stopped;
        info!("gabp server stopped");
    }
}
