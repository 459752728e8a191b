//! Internal mutable session state, owned entirely by the actor task.
//! No locks; every mutation goes through here and is followed by a
//! view snapshot broadcast.

use std::collections::HashMap;
use std::time::Instant;

use live_protocol::{
    GameResult, GameSummary, MoveDescriptor, MoveRecord, PlayerColor, PlayerInfo, SessionStatus,
};
use live_rules::{format_piece, AppliedMove, Position};

use crate::clock::{compute_remaining, ClockPair, ClockTimes};
use crate::config::SessionConfig;
use crate::error::MoveRejection;
use crate::presence::PresenceMonitor;
use crate::resume::{AutoResume, ResumeNegotiation};
use crate::transport::SessionInfo;
use crate::view::{ResumeView, SessionView};

/// Short-lived dedup set keyed by `(actor_id, san, post_fen)`.
/// Tolerates at-least-once event delivery and duplicate initialization.
#[derive(Debug, Default)]
pub(crate) struct EvalDedup {
    seen: HashMap<(String, String, String), Instant>,
}

impl EvalDedup {
    /// Returns true when the key is new (and records it). Expired
    /// entries are purged on the way through.
    pub fn insert_if_new(
        &mut self,
        key: (String, String, String),
        now: Instant,
        ttl: std::time::Duration,
    ) -> bool {
        self.seen.retain(|_, at| now.duration_since(*at) < ttl);
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }
}

pub(crate) struct SessionState {
    pub config: SessionConfig,
    pub session_id: String,
    pub local_player_id: String,
    pub local_color: PlayerColor,
    pub white: PlayerInfo,
    pub black: PlayerInfo,
    pub status: SessionStatus,
    pub turn: PlayerColor,
    pub fen: String,
    pub history: Vec<MoveRecord>,
    pub clocks: ClockPair,
    pub initial_clock_ms: u64,
    pub increment_ms: u64,
    pub negotiation: Option<ResumeNegotiation>,
    pub auto_resume: Option<AutoResume>,
    pub manual_resume_available: bool,
    pub presence: PresenceMonitor,
    pub connected: bool,
    pub white_score: f64,
    pub black_score: f64,
    pub result: Option<GameResult>,
    pub end_reason: Option<String>,
    pub notice: Option<String>,
    pub baseline_rating: u32,
    pub difficulty_factor: f64,
    /// Set once when the local clock hits zero; blocks further moves
    /// until an authoritative event settles the game.
    pub flag_fallen: Option<PlayerColor>,
    pub summary_emitted: bool,
    pub clock_low_notified: bool,
    pub dedup: EvalDedup,
    /// When the side to move started thinking; basis for elapsed time.
    pub turn_started: Instant,
}

impl SessionState {
    pub fn from_info(info: SessionInfo, config: SessionConfig, now: Instant) -> Self {
        // Prefer the server-persisted paused snapshot; recompute from
        // history only as a fallback.
        let times = match info.paused_clocks {
            Some(snap) => ClockTimes::from(snap),
            None => compute_remaining(&info.history, info.initial_clock_ms, info.increment_ms),
        };
        let mut clocks = ClockPair::new(times);
        if info.status == SessionStatus::Active {
            clocks.start(info.turn);
        }

        let (white_score, black_score) = info
            .history
            .last()
            .map(|r| (r.white_score, r.black_score))
            .unwrap_or((0.0, 0.0));

        let presence = PresenceMonitor::new(config.presence_timeout, config.prompt_countdown, now);

        Self {
            session_id: info.session_id,
            local_player_id: info.local_player_id,
            local_color: info.local_color,
            white: info.white,
            black: info.black,
            status: info.status,
            turn: info.turn,
            fen: info.fen,
            history: info.history,
            clocks,
            initial_clock_ms: info.initial_clock_ms,
            increment_ms: info.increment_ms,
            negotiation: None,
            auto_resume: None,
            manual_resume_available: false,
            presence,
            connected: true,
            white_score,
            black_score,
            result: None,
            end_reason: None,
            notice: None,
            baseline_rating: info.baseline_rating,
            difficulty_factor: info.difficulty_factor,
            flag_fallen: None,
            summary_emitted: false,
            clock_low_notified: false,
            dedup: EvalDedup::default(),
            turn_started: now,
            config,
        }
    }

    pub fn opponent(&self) -> &PlayerInfo {
        match self.local_color {
            PlayerColor::White => &self.black,
            PlayerColor::Black => &self.white,
        }
    }

    pub fn opponent_id(&self) -> &str {
        &self.opponent().id
    }

    pub fn opponent_name(&self) -> &str {
        &self.opponent().name
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active && self.flag_fallen.is_none()
    }

    /// `attempt_move` preconditions, checked before any mutation.
    pub fn validate_attempt(&self) -> Result<(), MoveRejection> {
        if !self.is_active() {
            return Err(MoveRejection::GameInactive);
        }
        if self.turn != self.local_color {
            return Err(MoveRejection::NotYourTurn);
        }
        if !self.connected {
            return Err(MoveRejection::Disconnected);
        }
        Ok(())
    }

    /// A position parsed from the current authoritative FEN. Never a
    /// cached board: authoritative state always wins.
    pub fn position(&self) -> Result<Position, live_rules::RulesError> {
        Position::from_fen(&self.fen)
    }

    pub fn add_score(&mut self, mover: PlayerColor, delta: f64) {
        match mover {
            PlayerColor::White => self.white_score += delta,
            PlayerColor::Black => self.black_score += delta,
        }
    }

    /// Apply a validated local move optimistically: board, history,
    /// clocks, turn, presence baseline. Returns the appended record.
    pub fn apply_local_move(
        &mut self,
        applied: &AppliedMove,
        score_delta: f64,
        now: Instant,
    ) -> MoveRecord {
        let mover = self.local_color;
        let elapsed_ms = now.duration_since(self.turn_started).as_millis() as u64;

        self.add_score(mover, score_delta);

        // Flush the mover's clock, hand the turn over, then apply the
        // increment to the side that just moved.
        self.clocks.switch_to(mover.opposite());
        match mover {
            PlayerColor::White => self.clocks.add_grace(self.increment_ms, 0),
            PlayerColor::Black => self.clocks.add_grace(0, self.increment_ms),
        }

        let record = self.build_record(applied, mover, elapsed_ms);
        self.fen = record.fen_after.clone();
        self.history.push(record.clone());
        self.turn = mover.opposite();
        self.turn_started = now;
        self.presence.record_activity(now);
        record
    }

    /// Apply a genuine remote move (echoes are filtered by the caller):
    /// overwrite the board with the event's FEN, append, flip turn.
    pub fn apply_remote_move(
        &mut self,
        descriptor: &MoveDescriptor,
        event_fen: &str,
        score_delta: f64,
        now: Instant,
    ) {
        let mover = descriptor.record.mover;
        self.add_score(mover, score_delta);

        let mut record = descriptor.record.clone();
        record.white_score = self.white_score;
        record.black_score = self.black_score;

        // Reconciliation by overwrite, never merge.
        self.fen = event_fen.to_string();
        self.history.push(record.clone());
        self.turn = mover.opposite();
        self.turn_started = now;

        // The descriptor's remainders already include the increment.
        self.clocks.rebase(ClockTimes {
            white_ms: record.white_remaining_ms,
            black_ms: record.black_remaining_ms,
        });
        if self.is_active() {
            self.clocks.switch_to(self.turn);
        }
    }

    /// Rebase clocks from an authoritative echo of our own move.
    pub fn rebase_from_echo(&mut self, record: &MoveRecord) {
        self.clocks.rebase(ClockTimes {
            white_ms: record.white_remaining_ms,
            black_ms: record.black_remaining_ms,
        });
    }

    fn build_record(&self, applied: &AppliedMove, mover: PlayerColor, elapsed_ms: u64) -> MoveRecord {
        let times = self.clocks.times();
        let (from, to) = (applied.uci[0..2].to_string(), applied.uci[2..4].to_string());
        MoveRecord {
            from,
            to,
            promotion: applied.mv.promotion.map(|p| format_piece(p).to_string()),
            san: applied.san.clone(),
            uci: applied.uci.clone(),
            mover,
            fen_before: applied.fen_before.clone(),
            fen_after: applied.fen_after.clone(),
            elapsed_ms,
            is_check: applied.is_check,
            is_checkmate: applied.is_checkmate,
            is_stalemate: applied.is_stalemate,
            white_score: self.white_score,
            black_score: self.black_score,
            white_remaining_ms: times.white_ms,
            black_remaining_ms: times.black_ms,
        }
    }

    pub fn descriptor_for(&self, record: MoveRecord) -> MoveDescriptor {
        MoveDescriptor {
            session_id: self.session_id.clone(),
            actor_id: self.local_player_id.clone(),
            record,
        }
    }

    /// Transition into a non-terminal status, gating the clocks.
    pub fn set_status(&mut self, status: SessionStatus, now: Instant) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        if status == SessionStatus::Active {
            self.clocks.start(self.turn);
            self.turn_started = now;
            self.presence.pause_cleared(now);
        } else {
            self.clocks.stop();
        }
    }

    /// Authoritative game end. Freezes the board, stops the clocks,
    /// and hands back the summary to persist (exactly once).
    pub fn apply_ended(
        &mut self,
        result: GameResult,
        end_reason: &str,
        final_fen: &str,
        white_score: f64,
        black_score: f64,
    ) -> Option<GameSummary> {
        self.status = if end_reason == "resignation" {
            SessionStatus::Resigned
        } else {
            SessionStatus::Finished
        };
        self.result = Some(result);
        self.end_reason = Some(end_reason.to_string());
        self.fen = final_fen.to_string();
        self.white_score = white_score;
        self.black_score = black_score;
        self.clocks.stop();
        self.negotiation = None;
        self.auto_resume = None;

        if self.summary_emitted {
            return None;
        }
        self.summary_emitted = true;

        let moves = live_protocol::encode_moves(
            self.history
                .iter()
                .map(|r| (r.san.as_str(), r.elapsed_ms / 1000)),
        );
        Some(GameSummary {
            session_id: self.session_id.clone(),
            white: self.white.clone(),
            black: self.black.clone(),
            result,
            end_reason: live_protocol::EndReason::parse(end_reason)
                .unwrap_or(live_protocol::EndReason::Abandoned),
            final_fen: self.fen.clone(),
            white_score,
            black_score,
            moves,
        })
    }

    pub fn snapshot(&self, now: Instant) -> SessionView {
        let times = self.clocks.times();
        let resume = self.negotiation.as_ref().map(|neg| ResumeView {
            direction: neg.direction,
            outcome: neg.outcome,
            expires_in_ms: neg.deadline.saturating_duration_since(now).as_millis() as u64,
        });
        let last_move = self
            .history
            .last()
            .map(|r| (r.from.clone(), r.to.clone()));

        SessionView {
            session_id: self.session_id.clone(),
            status: self.status,
            turn: self.turn,
            local_color: self.local_color,
            fen: self.fen.clone(),
            white: self.white.clone(),
            black: self.black.clone(),
            white_remaining_ms: times.white_ms,
            black_remaining_ms: times.black_ms,
            clock_running: self.clocks.running(),
            history: self.history.clone(),
            last_move,
            white_score: self.white_score,
            black_score: self.black_score,
            connected: self.connected,
            resume,
            presence_prompt_open: self.presence.prompt_open(),
            manual_resume_available: self.manual_resume_available,
            result: self.result,
            end_reason: self.end_reason.clone(),
            notice: self.notice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_dedup_suppresses_repeat_within_ttl() {
        let mut dedup = EvalDedup::default();
        let now = Instant::now();
        let ttl = Duration::from_secs(10);
        let key = ("p2".to_string(), "e4".to_string(), "fen".to_string());
        assert!(dedup.insert_if_new(key.clone(), now, ttl));
        assert!(!dedup.insert_if_new(key, now + Duration::from_secs(1), ttl));
    }

    #[test]
    fn test_dedup_expires() {
        let mut dedup = EvalDedup::default();
        let now = Instant::now();
        let ttl = Duration::from_secs(10);
        let key = ("p2".to_string(), "e4".to_string(), "fen".to_string());
        assert!(dedup.insert_if_new(key.clone(), now, ttl));
        assert!(dedup.insert_if_new(key, now + Duration::from_secs(11), ttl));
    }
}
