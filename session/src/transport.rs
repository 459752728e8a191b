//! Transport port: the duplex channel to the game server.
//!
//! The engine never talks to a socket directly; implementations adapt
//! whatever wire (WebSocket, gRPC stream, long-poll) to this trait and
//! decode payloads into `live_protocol` types before delivery.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use live_protocol::{
    ClockSnapshot, MoveDescriptor, MoveRecord, PlayerColor, PlayerInfo, ServerEvent, SessionStatus,
};

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Transport disconnected")]
    Disconnected,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Protocol violation: {0}")]
    Protocol(String),
}

/// Everything the initial session fetch returns. Authoritative.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub local_player_id: String,
    pub local_color: PlayerColor,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub status: SessionStatus,
    pub turn: PlayerColor,
    pub fen: String,
    pub history: Vec<MoveRecord>,
    pub initial_clock_ms: u64,
    pub increment_ms: u64,
    /// Server-persisted clock snapshot from the last pause, preferred
    /// over recomputation when present.
    pub paused_clocks: Option<ClockSnapshot>,
    /// Inputs for the move-quality evaluator.
    pub baseline_rating: u32,
    pub difficulty_factor: f64,
}

/// Authoritative answer to "is a resume request pending server-side?".
#[derive(Debug, Clone, Default)]
pub struct ResumeRequestStatus {
    pub pending_requester_id: Option<String>,
    pub expires_at_ms: Option<u64>,
}

/// Duplex channel to the server hosting the session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the authoritative session state.
    async fn fetch_session(&self) -> TransportResult<SessionInfo>;

    /// Re-fetch the authoritative move history (used on resume; the
    /// local copy cannot be trusted across a disconnect).
    async fn fetch_move_history(&self) -> TransportResult<Vec<MoveRecord>>;

    /// Subscribe to the server's event push channel.
    async fn subscribe(&self) -> TransportResult<mpsc::Receiver<ServerEvent>>;

    /// Transmit a move. Fire-and-forget: the authoritative echo comes
    /// back on the event channel.
    async fn send_move(&self, descriptor: MoveDescriptor) -> TransportResult<()>;

    /// Pause the session, persisting the given clock snapshot.
    async fn pause_game(&self, clocks: ClockSnapshot) -> TransportResult<()>;

    async fn resign_game(&self) -> TransportResult<()>;

    async fn offer_draw(&self) -> TransportResult<()>;
    async fn accept_draw(&self) -> TransportResult<()>;
    async fn decline_draw(&self) -> TransportResult<()>;

    async fn request_resume(&self) -> TransportResult<()>;
    async fn respond_resume(&self, accepted: bool) -> TransportResult<()>;

    /// Authoritative pre-send check for the resume race resolution.
    async fn resume_request_status(&self) -> TransportResult<ResumeRequestStatus>;

    /// Clear any pending resume request (teardown, resignation).
    async fn clear_resume_request(&self) -> TransportResult<()>;

    /// Report that the running clock reached zero.
    async fn forfeit_by_timeout(&self) -> TransportResult<()>;
}
