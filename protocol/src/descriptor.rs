//! Payloads exchanged with the server: the verbose live move descriptor,
//! clock snapshots, and the finished-session summary handed to
//! persistence.

use serde::{Deserialize, Serialize};

use crate::types::{EndReason, GameResult, PlayerColor};

/// A participant in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub rating: u32,
}

/// Remaining time for both clocks at a point in time. Carried on pause
/// requests so the server can persist an authoritative snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
}

/// One completed ply, immutable once appended to the history.
///
/// `fen_before` of each record equals `fen_after` of the previous one
/// (or the initial position FEN for the first record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    pub san: String,
    pub uci: String,
    pub mover: PlayerColor,
    pub fen_before: String,
    pub fen_after: String,
    /// Time the mover spent on this ply.
    pub elapsed_ms: u64,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    /// Cumulative move-quality scores for both sides after this ply.
    pub white_score: f64,
    pub black_score: f64,
    /// Clock remainders for both sides after this ply.
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
}

/// The full move payload transmitted on every local move. The server
/// redistributes it verbatim; the compact `wire` encoding exists only
/// for history persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    pub session_id: String,
    pub actor_id: String,
    #[serde(flatten)]
    pub record: MoveRecord,
}

/// Normalized finished-session payload handed to the persistence port
/// exactly once, when the session reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub session_id: String,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub result: GameResult,
    pub end_reason: EndReason,
    pub final_fen: String,
    pub white_score: f64,
    pub black_score: f64,
    /// Compact `SAN,elapsedSeconds;…` encoding of the full history.
    pub moves: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> MoveRecord {
        MoveRecord {
            from: "e2".into(),
            to: "e4".into(),
            promotion: None,
            san: "e4".into(),
            uci: "e2e4".into(),
            mover: PlayerColor::White,
            fen_before: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
            fen_after: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1".into(),
            elapsed_ms: 5200,
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
            white_score: 1.0,
            black_score: 0.0,
            white_remaining_ms: 594_800,
            black_remaining_ms: 600_000,
        }
    }

    #[test]
    fn test_descriptor_round_trips_through_json() {
        let desc = MoveDescriptor {
            session_id: "s1".into(),
            actor_id: "p1".into(),
            record: sample_record(),
        };
        let json = serde_json::to_string(&desc).unwrap();
        let back: MoveDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_descriptor_flattens_record_fields() {
        let desc = MoveDescriptor {
            session_id: "s1".into(),
            actor_id: "p1".into(),
            record: sample_record(),
        };
        let value = serde_json::to_value(&desc).unwrap();
        // Wire format is flat: SAN sits next to actor_id, not nested.
        assert_eq!(value["san"], "e4");
        assert_eq!(value["actor_id"], "p1");
    }
}
