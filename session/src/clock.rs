//! Clock reconciliation and local ticking.
//!
//! The source of truth for remaining time is the move history (plus a
//! server-persisted snapshot after a pause). The running [`ClockPair`]
//! is a presentation derivative: it is rebased from authoritative data
//! whenever an authoritative event arrives.

use std::time::Instant;

use live_protocol::{ClockSnapshot, MoveRecord, PlayerColor};

/// Remaining time per side, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTimes {
    pub white_ms: u64,
    pub black_ms: u64,
}

impl ClockTimes {
    pub fn both(ms: u64) -> Self {
        Self {
            white_ms: ms,
            black_ms: ms,
        }
    }
}

impl From<ClockSnapshot> for ClockTimes {
    fn from(snap: ClockSnapshot) -> Self {
        Self {
            white_ms: snap.white_remaining_ms,
            black_ms: snap.black_remaining_ms,
        }
    }
}

/// Derive remaining time from the full move history.
///
/// Both sides start at `initial_ms`; each move subtracts its elapsed
/// time from the mover's total, then adds `increment_ms` to that same
/// side. Values saturate at zero — this computation is informational
/// for past state, the server remains authoritative.
pub fn compute_remaining(history: &[MoveRecord], initial_ms: u64, increment_ms: u64) -> ClockTimes {
    let mut times = ClockTimes::both(initial_ms);
    for record in history {
        let side = match record.mover {
            PlayerColor::White => &mut times.white_ms,
            PlayerColor::Black => &mut times.black_ms,
        };
        *side = side.saturating_sub(record.elapsed_ms) + increment_ms;
    }
    times
}

/// Two chess clocks, at most one running at a time.
#[derive(Debug)]
pub struct ClockPair {
    white_ms: u64,
    black_ms: u64,
    running: Option<PlayerColor>,
    last_tick: Instant,
}

impl ClockPair {
    pub fn new(times: ClockTimes) -> Self {
        Self {
            white_ms: times.white_ms,
            black_ms: times.black_ms,
            running: None,
            last_tick: Instant::now(),
        }
    }

    /// Replace both remainders with authoritative values, discarding
    /// any locally ticked drift. The running side is preserved.
    pub fn rebase(&mut self, times: ClockTimes) {
        self.white_ms = times.white_ms;
        self.black_ms = times.black_ms;
        self.last_tick = Instant::now();
    }

    /// Add a per-side grace bonus (resume reconciliation).
    pub fn add_grace(&mut self, white_ms: u64, black_ms: u64) {
        self.white_ms += white_ms;
        self.black_ms += black_ms;
    }

    pub fn start(&mut self, side: PlayerColor) {
        self.last_tick = Instant::now();
        self.running = Some(side);
    }

    /// Flush elapsed time, then stop both clocks.
    pub fn stop(&mut self) {
        self.tick();
        self.running = None;
    }

    pub fn switch_to(&mut self, side: PlayerColor) {
        self.tick();
        self.running = Some(side);
        self.last_tick = Instant::now();
    }

    /// Deduct wall-clock time from the running side. Returns the side
    /// whose flag fell, at most once: a fallen flag stops the clock, so
    /// repeated ticks cannot emit a second timeout signal.
    pub fn tick(&mut self) -> Option<PlayerColor> {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_millis() as u64;
        self.last_tick = now;
        self.tick_with_elapsed(elapsed_ms)
    }

    /// Tick with an explicit elapsed duration (used by tests).
    pub fn tick_with_elapsed(&mut self, elapsed_ms: u64) -> Option<PlayerColor> {
        let side = self.running?;
        let remaining = match side {
            PlayerColor::White => &mut self.white_ms,
            PlayerColor::Black => &mut self.black_ms,
        };
        *remaining = remaining.saturating_sub(elapsed_ms);
        if *remaining == 0 {
            self.running = None;
            Some(side)
        } else {
            None
        }
    }

    pub fn remaining(&self, side: PlayerColor) -> u64 {
        match side {
            PlayerColor::White => self.white_ms,
            PlayerColor::Black => self.black_ms,
        }
    }

    pub fn running(&self) -> Option<PlayerColor> {
        self.running
    }

    pub fn times(&self) -> ClockTimes {
        ClockTimes {
            white_ms: self.white_ms,
            black_ms: self.black_ms,
        }
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            white_remaining_ms: self.white_ms,
            black_remaining_ms: self.black_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mover: PlayerColor, elapsed_ms: u64) -> MoveRecord {
        MoveRecord {
            from: "e2".into(),
            to: "e4".into(),
            promotion: None,
            san: "e4".into(),
            uci: "e2e4".into(),
            mover,
            fen_before: String::new(),
            fen_after: String::new(),
            elapsed_ms,
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
            white_score: 0.0,
            black_score: 0.0,
            white_remaining_ms: 0,
            black_remaining_ms: 0,
        }
    }

    #[test]
    fn test_compute_remaining_empty_history() {
        let times = compute_remaining(&[], 600_000, 0);
        assert_eq!(times, ClockTimes::both(600_000));
    }

    // Scenario A: 600,000ms/side, no increment, white moves after 5.2s.
    #[test]
    fn test_compute_remaining_single_white_move() {
        let history = vec![record(PlayerColor::White, 5_200)];
        let times = compute_remaining(&history, 600_000, 0);
        assert_eq!(times.white_ms, 594_800);
        assert_eq!(times.black_ms, 600_000);
    }

    #[test]
    fn test_compute_remaining_increment_after_move() {
        let history = vec![
            record(PlayerColor::White, 10_000),
            record(PlayerColor::Black, 4_000),
        ];
        let times = compute_remaining(&history, 60_000, 2_000);
        assert_eq!(times.white_ms, 52_000);
        assert_eq!(times.black_ms, 58_000);
    }

    #[test]
    fn test_compute_remaining_saturates_at_zero() {
        let history = vec![record(PlayerColor::White, 90_000)];
        let times = compute_remaining(&history, 60_000, 1_000);
        // Saturates before the increment lands.
        assert_eq!(times.white_ms, 1_000);
        assert_eq!(times.black_ms, 60_000);
    }

    /// Conservation law: white + black == 2*initial + increment*n - sum(elapsed),
    /// given no step saturates.
    #[test]
    fn test_conservation_law() {
        let history = vec![
            record(PlayerColor::White, 5_000),
            record(PlayerColor::Black, 7_000),
            record(PlayerColor::White, 2_500),
            record(PlayerColor::Black, 11_000),
        ];
        let initial = 300_000;
        let increment = 3_000;
        let times = compute_remaining(&history, initial, increment);
        let spent: u64 = history.iter().map(|r| r.elapsed_ms).sum();
        assert_eq!(
            times.white_ms + times.black_ms,
            2 * initial + increment * history.len() as u64 - spent
        );
    }

    #[test]
    fn test_tick_reduces_running_side_only() {
        let mut clocks = ClockPair::new(ClockTimes::both(180_000));
        clocks.start(PlayerColor::White);
        assert_eq!(clocks.tick_with_elapsed(1_000), None);
        assert_eq!(clocks.remaining(PlayerColor::White), 179_000);
        assert_eq!(clocks.remaining(PlayerColor::Black), 180_000);
    }

    #[test]
    fn test_stopped_clocks_do_not_tick() {
        let mut clocks = ClockPair::new(ClockTimes::both(180_000));
        assert_eq!(clocks.tick_with_elapsed(10_000), None);
        assert_eq!(clocks.remaining(PlayerColor::White), 180_000);
        assert_eq!(clocks.remaining(PlayerColor::Black), 180_000);
    }

    #[test]
    fn test_flag_emitted_exactly_once() {
        let mut clocks = ClockPair::new(ClockTimes::both(3_000));
        clocks.start(PlayerColor::Black);
        assert_eq!(clocks.tick_with_elapsed(5_000), Some(PlayerColor::Black));
        assert_eq!(clocks.remaining(PlayerColor::Black), 0);
        // Clock stopped itself; no second signal.
        assert_eq!(clocks.tick_with_elapsed(5_000), None);
        assert_eq!(clocks.running(), None);
    }

    #[test]
    fn test_rebase_discards_drift() {
        let mut clocks = ClockPair::new(ClockTimes::both(60_000));
        clocks.start(PlayerColor::White);
        clocks.tick_with_elapsed(2_500);
        clocks.rebase(ClockTimes {
            white_ms: 59_000,
            black_ms: 60_000,
        });
        assert_eq!(clocks.remaining(PlayerColor::White), 59_000);
        assert_eq!(clocks.running(), Some(PlayerColor::White));
    }

    #[test]
    fn test_add_grace() {
        let mut clocks = ClockPair::new(ClockTimes {
            white_ms: 10_000,
            black_ms: 20_000,
        });
        clocks.add_grace(40_000, 40_000);
        assert_eq!(clocks.remaining(PlayerColor::White), 50_000);
        assert_eq!(clocks.remaining(PlayerColor::Black), 60_000);
    }
}
