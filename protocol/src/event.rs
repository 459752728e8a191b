//! Inbound server events as a closed discriminated union.
//!
//! Transports decode raw payloads with [`decode_event`] before dispatch,
//! so the engine only ever sees well-formed variants. Unknown event
//! names are a decode error, not a silently ignored payload.

use serde::{Deserialize, Serialize};

use crate::descriptor::{MoveDescriptor, PlayerInfo};
use crate::types::{GameResult, PlayerColor, ResumeOutcome, SessionStatus};

/// What kind of connection change a `ConnectionChanged` event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Joined,
    Left,
    Reconnected,
}

/// Every event the server can push to a session subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Transport established its channel.
    Connected,
    /// Transport lost its channel; the session survives.
    Disconnected,
    /// A move was played by either participant (including the echo of
    /// the local player's own move).
    Move {
        actor_id: String,
        fen: String,
        #[serde(rename = "move")]
        descriptor: MoveDescriptor,
    },
    /// Authoritative status change outside the more specific events.
    StatusChanged {
        status: SessionStatus,
        result: Option<GameResult>,
    },
    /// The game is over. Always authoritative, supersedes any local
    /// provisional result.
    Ended {
        result: GameResult,
        end_reason: String,
        winner_id: Option<String>,
        final_fen: String,
        white_score: f64,
        black_score: f64,
        white: PlayerInfo,
        black: PlayerInfo,
    },
    /// Both players present, game is live.
    Activated,
    /// Resume negotiation concluded with acceptance; play continues.
    Resumed {
        turn: PlayerColor,
        grace_ms_white: u64,
        grace_ms_black: u64,
    },
    /// The session was paused.
    Paused { paused_by_name: String },
    /// A resume request is pending (sent by either side).
    ResumeRequestSent { requester_id: String, expires_at_ms: u64 },
    /// The counterpart answered a resume request.
    ResumeRequestResponse { outcome: ResumeOutcome },
    /// A pending resume request lapsed server-side.
    ResumeRequestExpired,
    /// A participant's presence on the channel changed.
    ConnectionChanged {
        actor_id: String,
        kind: ConnectionKind,
    },
    /// Server-side error surfaced to the client.
    Error { message: String },
}

/// Decode a raw JSON payload into a [`ServerEvent`], rejecting unknown
/// or malformed events at the transport boundary.
pub fn decode_event(raw: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Encode an event back to its wire form (used by mock transports and
/// recording proxies).
pub fn encode_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_paused() {
        let raw = r#"{"type":"paused","paused_by_name":"alice"}"#;
        let event = decode_event(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Paused {
                paused_by_name: "alice".into()
            }
        );
    }

    #[test]
    fn test_decode_resumed() {
        let raw = r#"{"type":"resumed","turn":"black","grace_ms_white":40000,"grace_ms_black":40000}"#;
        let event = decode_event(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Resumed {
                turn: PlayerColor::Black,
                grace_ms_white: 40_000,
                grace_ms_black: 40_000,
            }
        );
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        let raw = r#"{"type":"mystery","payload":1}"#;
        assert!(decode_event(raw).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let raw = r#"{"type":"resume_request_sent","requester_id":"p2"}"#;
        assert!(decode_event(raw).is_err());
    }

    #[test]
    fn test_round_trip() {
        let event = ServerEvent::ResumeRequestSent {
            requester_id: "p2".into(),
            expires_at_ms: 1_700_000_010_000,
        };
        let raw = encode_event(&event).unwrap();
        assert_eq!(decode_event(&raw).unwrap(), event);
    }
}
