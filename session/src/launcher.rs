//! Session bootstrap and the idempotent launcher registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, RwLock};

use crate::actor::{run_session_actor, ActorDeps};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::handle::SessionHandle;
use crate::ports::SessionPorts;
use crate::state::SessionState;
use crate::transport::Transport;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 128;

/// Fetch the authoritative session state, subscribe to the server's
/// event channel, and spawn the actor. Returns a handle; the actor runs
/// until `shutdown` or the server stream ends with the game settled.
pub async fn start_session(
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    ports: SessionPorts,
) -> SessionResult<SessionHandle> {
    let info = transport.fetch_session().await?;
    let server_rx = transport.subscribe().await?;

    let state = SessionState::from_info(info, config, Instant::now());
    let session_id = state.session_id.clone();

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    tokio::spawn(run_session_actor(
        state,
        ActorDeps { transport, ports },
        cmd_rx,
        server_rx,
        event_tx,
    ));

    Ok(SessionHandle::new(session_id, cmd_tx))
}

/// Registry of live sessions keyed by session id.
///
/// `initialize` is idempotent: a second call for a session that is
/// already running returns the existing handle instead of spawning a
/// duplicate actor. UI layers can therefore re-enter a game screen
/// without double-initialization.
pub struct SessionLauncher {
    config: SessionConfig,
    ports: SessionPorts,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionLauncher {
    pub fn new(config: SessionConfig, ports: SessionPorts) -> Self {
        Self {
            config,
            ports,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start (or return the already-running) session engine.
    pub async fn initialize(
        &self,
        session_id: &str,
        transport: Arc<dyn Transport>,
    ) -> SessionResult<SessionHandle> {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Ok(handle.clone());
        }

        // The write lock covers fetch-and-insert so two racing callers
        // cannot both spawn an actor for the same session.
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(session_id) {
            return Ok(handle.clone());
        }

        let handle = start_session(self.config.clone(), transport, self.ports.clone()).await?;
        if handle.id() != session_id {
            handle.shutdown().await;
            return Err(SessionError::Internal(format!(
                "transport returned session {}, expected {}",
                handle.id(),
                session_id
            )));
        }
        sessions.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Stop a session's actor and drop it from the registry.
    pub async fn shutdown(&self, session_id: &str) {
        let handle = self.sessions.write().await.remove(session_id);
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// Stop everything (application teardown).
    pub async fn shutdown_all(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}
