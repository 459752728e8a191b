//! Derived, immutable view of the session for rendering layers.

use live_protocol::{GameResult, MoveRecord, PlayerColor, PlayerInfo, ResumeOutcome, SessionStatus};

use crate::resume::ResumeDirection;

/// Resume negotiation as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeView {
    pub direction: ResumeDirection,
    pub outcome: ResumeOutcome,
    /// Advisory countdown only; the server owns actual expiry.
    pub expires_in_ms: u64,
}

/// Complete snapshot handed to the rendering layer on every state
/// change. The engine owns the mutable truth; consumers only ever see
/// this immutable derivative.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: String,
    pub status: SessionStatus,
    pub turn: PlayerColor,
    pub local_color: PlayerColor,
    pub fen: String,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub clock_running: Option<PlayerColor>,
    pub history: Vec<MoveRecord>,
    pub last_move: Option<(String, String)>,
    pub white_score: f64,
    pub black_score: f64,
    pub connected: bool,
    pub resume: Option<ResumeView>,
    pub presence_prompt_open: bool,
    /// Set when auto-resume exhausted its retries.
    pub manual_resume_available: bool,
    pub result: Option<GameResult>,
    pub end_reason: Option<String>,
    /// Last human-readable notice (pause attribution, peer connection
    /// changes). Display-only.
    pub notice: Option<String>,
}

impl SessionView {
    pub fn is_local_turn(&self) -> bool {
        self.turn == self.local_color
    }

    pub fn local_player(&self) -> &PlayerInfo {
        match self.local_color {
            PlayerColor::White => &self.white,
            PlayerColor::Black => &self.black,
        }
    }

    pub fn opponent(&self) -> &PlayerInfo {
        match self.local_color {
            PlayerColor::White => &self.black,
            PlayerColor::Black => &self.white,
        }
    }
}

/// Events broadcast from the session actor to subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum EngineEvent {
    /// Full view snapshot after any mutation.
    StateChanged(SessionView),
    /// Lightweight 1-second clock update (frequent; no history clone).
    ClockTick {
        white_ms: u64,
        black_ms: u64,
        running: Option<PlayerColor>,
    },
    /// The presence monitor wants the player to confirm they are here.
    PresencePrompt { countdown_ms: u64 },
    /// Non-fatal error surfaced to the UI.
    Error(String),
}
