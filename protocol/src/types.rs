//! Project-owned identity and status types.
//! cozy-chess types are an implementation detail of the rules crate and
//! never appear on the wire.

use serde::{Deserialize, Serialize};

/// Side of the board a participant plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

}

impl std::fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Loading,
    Active,
    Paused,
    Finished,
    Aborted,
    Resigned,
}

impl SessionStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted | Self::Resigned)
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Resignation,
    Timeout,
    DrawAgreed,
    Abandoned,
}

impl EndReason {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "checkmate" => Some(Self::Checkmate),
            "stalemate" => Some(Self::Stalemate),
            "resignation" => Some(Self::Resignation),
            "timeout" => Some(Self::Timeout),
            "draw_agreed" => Some(Self::DrawAgreed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

/// Outcome of a finished game from white's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameResult {
    pub fn winner(self) -> Option<PlayerColor> {
        match self {
            Self::WhiteWins => Some(PlayerColor::White),
            Self::BlackWins => Some(PlayerColor::Black),
            Self::Draw => None,
        }
    }
}

/// Outcome of a resume negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeOutcome {
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_opposite() {
        assert_eq!(PlayerColor::White.opposite(), PlayerColor::Black);
        assert_eq!(PlayerColor::Black.opposite(), PlayerColor::White);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SessionStatus::Finished.is_terminal());
        assert!(SessionStatus::Aborted.is_terminal());
        assert!(SessionStatus::Resigned.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(!SessionStatus::Paused.is_terminal());
        assert!(!SessionStatus::Loading.is_terminal());
    }

    #[test]
    fn test_result_winner() {
        assert_eq!(GameResult::WhiteWins.winner(), Some(PlayerColor::White));
        assert_eq!(GameResult::Draw.winner(), None);
    }
}
