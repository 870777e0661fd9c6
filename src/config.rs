//! Ambient configuration read from the process environment.
//!
//! This mirrors the teacher's `main.rs` pattern of `env::var(...)` calls with
//! documented fallbacks rather than a config file parser — GABP has no
//! persisted config of its own, only the handful of environment collaborators
//! named in `spec.md` §6.

use rand::RngCore;
use tracing::warn;

/// Environment-derived server configuration.
///
/// The embedder may also construct this directly (it has no required
/// fields) — reading the environment is a convenience default, not the only
/// way to obtain a port, token, or agent id.
#[derive(Debug, Clone)]
pub struct GabpConfig {
    /// TCP port to bind. `0` means kernel-assigned (ephemeral).
    pub port: u16,
    /// Shared secret the bridge must present in `session/hello`.
    pub token: String,
    /// Identifier reported as `agentId` in the handshake welcome result.
    pub agent_id: String,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
}

impl GabpConfig {
    /// Builds a config from `GABP_SERVER_PORT`, `GABP_TOKEN`, `GABS_GAME_ID`,
    /// and `GABP_LOG`, each falling back to a documented default.
    ///
    /// A missing `GABP_TOKEN` is not an error: a random token is generated
    /// and a warning is logged, since an embedder that wants a fixed token
    /// should set the variable explicitly.
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("GABP_SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let token = std::env::var("GABP_TOKEN").unwrap_or_else(|_| {
            let generated = generate_token();
            warn!("GABP_TOKEN not set; generated a random session token");
            generated
        });

        let agent_id =
            std::env::var("GABS_GAME_ID").unwrap_or_else(|_| "gabp-server".to_owned());

        let log_filter = std::env::var("GABP_LOG").unwrap_or_else(|_| "info".to_owned());

        Self {
            port,
            token,
            agent_id,
            log_filter,
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
