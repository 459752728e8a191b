//! Error types for the session engine.

use thiserror::Error;

use crate::transport::TransportError;

pub type SessionResult<T> = Result<T, SessionError>;

/// Why `attempt_move` refused to do anything. These are local and
/// transient; nothing is transmitted and no state is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    NotYourTurn,
    GameInactive,
    Disconnected,
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotYourTurn => "not your turn",
            Self::GameInactive => "game is not active",
            Self::Disconnected => "transport disconnected",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Move rejected: {0}")]
    Rejected(MoveRejection),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Unauthorized for this session")]
    Unauthorized,

    /// Connectivity failure on an RPC. Retryable; distinct from a
    /// local move rejection.
    #[error("Transport disconnected")]
    Disconnected,

    /// Retryable server-side failure, surfaced with a readable message.
    #[error("Server error: {0}")]
    Server(String),

    #[error("A resume request is already pending")]
    ResumePending,

    #[error("Session is not paused")]
    NotPaused,

    #[error("No resume request to respond to")]
    NoResumeRequest,

    #[error("Session engine closed")]
    EngineClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

// `Rejected` is reserved for `validate_attempt` outcomes; transport
// failures keep their own shape.
impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized => Self::Unauthorized,
            TransportError::Disconnected => Self::Disconnected,
            other => Self::Server(other.to_string()),
        }
    }
}

impl From<live_rules::RulesError> for SessionError {
    fn from(err: live_rules::RulesError) -> Self {
        Self::IllegalMove(err.to_string())
    }
}
