//! Pause/resume negotiation state.
//!
//! One tagged [`ResumeNegotiation`] replaces the pile of boolean race
//! guards this protocol tends to accumulate. At most one negotiation
//! exists per session; the ordered [`resolve_race`] check plus the
//! authoritative pre-send query enforce that across both participants.

use std::time::{Duration, Instant};

use live_protocol::ResumeOutcome;

/// Who initiated the pending negotiation, from the local perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDirection {
    Sent,
    Received,
}

#[derive(Debug, Clone)]
pub struct ResumeNegotiation {
    pub direction: ResumeDirection,
    pub counterpart_id: String,
    /// Local advisory deadline; the server is ground truth for expiry.
    pub deadline: Instant,
    pub outcome: ResumeOutcome,
}

impl ResumeNegotiation {
    pub fn sent(counterpart_id: String, deadline: Instant) -> Self {
        Self {
            direction: ResumeDirection::Sent,
            counterpart_id,
            deadline,
            outcome: ResumeOutcome::Pending,
        }
    }

    pub fn received(counterpart_id: String, deadline: Instant) -> Self {
        Self {
            direction: ResumeDirection::Received,
            counterpart_id,
            deadline,
            outcome: ResumeOutcome::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == ResumeOutcome::Pending
    }
}

/// Result of the ordered pre-send check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceResolution {
    /// The counterpart already asked us; respond instead of sending.
    AlreadyReceived,
    /// Our own request is already out; do not send a duplicate.
    AlreadyPending,
    /// The server has the counterpart's request pending; treat it as
    /// received rather than sending a duplicate.
    CounterpartPending,
    ClearToSend,
}

/// The ordered race check of the handshake protocol. `server_pending`
/// is the requester id the authoritative status query reported, if any.
pub fn resolve_race(
    local: Option<&ResumeNegotiation>,
    server_pending: Option<&str>,
    local_player_id: &str,
) -> RaceResolution {
    // (1) already received locally?
    if let Some(neg) = local {
        if neg.is_pending() && neg.direction == ResumeDirection::Received {
            return RaceResolution::AlreadyReceived;
        }
        // (2) already pending locally?
        if neg.is_pending() && neg.direction == ResumeDirection::Sent {
            return RaceResolution::AlreadyPending;
        }
    }
    // (3) authoritative server status.
    match server_pending {
        Some(requester) if requester != local_player_id => RaceResolution::CounterpartPending,
        Some(_) => RaceResolution::AlreadyPending,
        None => RaceResolution::ClearToSend,
    }
}

/// Bounded auto-resume retry schedule with increasing backoff. Entry
/// `n` of the schedule is the delay before attempt `n + 1`; the
/// schedule length bounds the attempt count.
#[derive(Debug)]
pub struct AutoResume {
    schedule: Vec<Duration>,
    attempts_made: usize,
    next_at: Option<Instant>,
}

impl AutoResume {
    /// First attempt fires after the first backoff delay.
    pub fn new(schedule: Vec<Duration>, now: Instant) -> Self {
        let next_at = schedule.first().map(|delay| now + *delay);
        Self {
            schedule,
            attempts_made: 0,
            next_at,
        }
    }

    pub fn next_at(&self) -> Option<Instant> {
        self.next_at
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next_at.is_some_and(|at| now >= at)
    }

    /// Consume the pending attempt. Returns the attempt number (1-based).
    pub fn take_attempt(&mut self) -> usize {
        self.next_at = None;
        self.attempts_made += 1;
        self.attempts_made
    }

    /// The attempt failed (transport error, decline, or expiry).
    /// Schedules the next one, or reports exhaustion.
    pub fn attempt_failed(&mut self, now: Instant) -> bool {
        match self.schedule.get(self.attempts_made) {
            Some(delay) => {
                self.next_at = Some(now + *delay);
                false
            }
            None => {
                self.next_at = None;
                true
            }
        }
    }

    pub fn exhausted(&self) -> bool {
        self.next_at.is_none() && self.attempts_made >= self.schedule.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_sent() -> ResumeNegotiation {
        ResumeNegotiation::sent("p2".into(), Instant::now() + Duration::from_secs(10))
    }

    fn pending_received() -> ResumeNegotiation {
        ResumeNegotiation::received("p2".into(), Instant::now() + Duration::from_secs(10))
    }

    #[test]
    fn test_received_wins_over_everything() {
        let neg = pending_received();
        assert_eq!(
            resolve_race(Some(&neg), Some("p2"), "p1"),
            RaceResolution::AlreadyReceived
        );
    }

    #[test]
    fn test_local_pending_blocks_send() {
        let neg = pending_sent();
        assert_eq!(
            resolve_race(Some(&neg), None, "p1"),
            RaceResolution::AlreadyPending
        );
    }

    #[test]
    fn test_server_pending_counterpart_treated_as_received() {
        assert_eq!(
            resolve_race(None, Some("p2"), "p1"),
            RaceResolution::CounterpartPending
        );
    }

    #[test]
    fn test_server_pending_own_request() {
        // Our request is pending server-side but we lost local state
        // (reload): still no duplicate send.
        assert_eq!(
            resolve_race(None, Some("p1"), "p1"),
            RaceResolution::AlreadyPending
        );
    }

    #[test]
    fn test_clear_to_send() {
        assert_eq!(resolve_race(None, None, "p1"), RaceResolution::ClearToSend);
    }

    /// Simultaneous requests: each side queries the server after the
    /// other's request landed. Exactly one "sent", one "received".
    #[test]
    fn test_simultaneous_requests_resolve_asymmetrically() {
        // Player 1 sent first; player 2's check sees it pending.
        let p1 = resolve_race(Some(&pending_sent()), Some("p1"), "p1");
        let p2 = resolve_race(None, Some("p1"), "p2");
        assert_eq!(p1, RaceResolution::AlreadyPending);
        assert_eq!(p2, RaceResolution::CounterpartPending);
    }

    #[test]
    fn test_resolved_negotiation_does_not_block() {
        let mut neg = pending_sent();
        neg.outcome = ResumeOutcome::Declined;
        assert_eq!(
            resolve_race(Some(&neg), None, "p1"),
            RaceResolution::ClearToSend
        );
    }

    /// Every schedule entry is spent as a delay: 1 s before attempt 1,
    /// 2 s before attempt 2, 4 s before attempt 3.
    #[test]
    fn test_auto_resume_consumes_every_backoff_delay() {
        let now = Instant::now();
        let mut auto = AutoResume::new(
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            now,
        );
        assert!(!auto.due(now));
        assert_eq!(auto.next_at(), Some(now + Duration::from_secs(1)));

        let t1 = now + Duration::from_secs(1);
        assert!(auto.due(t1));
        assert_eq!(auto.take_attempt(), 1);
        assert!(!auto.attempt_failed(t1));
        assert_eq!(auto.next_at(), Some(t1 + Duration::from_secs(2)));

        let t2 = t1 + Duration::from_secs(2);
        assert_eq!(auto.take_attempt(), 2);
        assert!(!auto.attempt_failed(t2));
        assert_eq!(auto.next_at(), Some(t2 + Duration::from_secs(4)));

        assert_eq!(auto.take_attempt(), 3);
        assert!(
            auto.attempt_failed(t2 + Duration::from_secs(4)),
            "third failure exhausts retries"
        );
        assert!(auto.exhausted());
    }
}
