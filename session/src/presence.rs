//! Local-player inactivity detection.
//!
//! A 1-second check in the actor loop calls [`PresenceMonitor::check`]
//! while the session is active. "Activity" is defined narrowly: the
//! local player completing a legal move on their own turn. Receiving
//! the opponent's move does not reset the baseline — the monitor
//! watches the local player only; the remote side runs its own.

use std::time::{Duration, Instant};

/// What the actor should do after a presence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceAction {
    /// Idle threshold crossed: ask the player to confirm they are here.
    RaisePrompt,
    /// The confirmation prompt lapsed: request a session pause.
    RequestPause,
}

#[derive(Debug)]
pub struct PresenceMonitor {
    last_activity: Instant,
    prompt_deadline: Option<Instant>,
    pause_in_flight: bool,
    idle_timeout: Duration,
    prompt_countdown: Duration,
}

impl PresenceMonitor {
    pub fn new(idle_timeout: Duration, prompt_countdown: Duration, now: Instant) -> Self {
        Self {
            last_activity: now,
            prompt_deadline: None,
            pause_in_flight: false,
            idle_timeout,
            prompt_countdown,
        }
    }

    /// The local player completed a move on their own turn.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.prompt_deadline = None;
    }

    /// The player confirmed the prompt: baseline resets immediately.
    pub fn confirm(&mut self, now: Instant) {
        self.record_activity(now);
    }

    pub fn prompt_open(&self) -> bool {
        self.prompt_deadline.is_some()
    }

    pub fn pause_in_flight(&self) -> bool {
        self.pause_in_flight
    }

    /// A pause request left the building; suppress further prompts
    /// until it resolves one way or the other.
    pub fn pause_requested(&mut self) {
        self.pause_in_flight = true;
        self.prompt_deadline = None;
    }

    /// The pause resolved (session paused, request failed, or resumed).
    pub fn pause_cleared(&mut self, now: Instant) {
        self.pause_in_flight = false;
        self.record_activity(now);
    }

    /// The 1-second check. Never raises a prompt while one is open or
    /// while a pause is in flight.
    pub fn check(&mut self, now: Instant) -> Option<PresenceAction> {
        if self.pause_in_flight {
            return None;
        }

        if let Some(deadline) = self.prompt_deadline {
            if now >= deadline {
                return Some(PresenceAction::RequestPause);
            }
            return None;
        }

        if now.duration_since(self.last_activity) >= self.idle_timeout {
            self.prompt_deadline = Some(now + self.prompt_countdown);
            return Some(PresenceAction::RaisePrompt);
        }

        None
    }

    /// Remaining prompt time for display.
    pub fn prompt_remaining(&self, now: Instant) -> Option<Duration> {
        self.prompt_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(now: Instant) -> PresenceMonitor {
        PresenceMonitor::new(Duration::from_secs(60), Duration::from_secs(15), now)
    }

    #[test]
    fn test_no_action_before_threshold() {
        let start = Instant::now();
        let mut m = monitor(start);
        assert_eq!(m.check(start + Duration::from_secs(59)), None);
    }

    #[test]
    fn test_prompt_raised_at_threshold() {
        let start = Instant::now();
        let mut m = monitor(start);
        assert_eq!(
            m.check(start + Duration::from_secs(60)),
            Some(PresenceAction::RaisePrompt)
        );
        assert!(m.prompt_open());
    }

    #[test]
    fn test_prompt_not_raised_twice() {
        let start = Instant::now();
        let mut m = monitor(start);
        let t = start + Duration::from_secs(60);
        assert_eq!(m.check(t), Some(PresenceAction::RaisePrompt));
        assert_eq!(m.check(t + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_prompt_lapse_requests_pause() {
        let start = Instant::now();
        let mut m = monitor(start);
        let t = start + Duration::from_secs(60);
        m.check(t);
        assert_eq!(
            m.check(t + Duration::from_secs(15)),
            Some(PresenceAction::RequestPause)
        );
    }

    #[test]
    fn test_confirm_resets_baseline() {
        let start = Instant::now();
        let mut m = monitor(start);
        let t = start + Duration::from_secs(60);
        m.check(t);
        m.confirm(t + Duration::from_secs(5));
        assert!(!m.prompt_open());
        assert_eq!(m.check(t + Duration::from_secs(30)), None);
    }

    #[test]
    fn test_activity_resets_baseline() {
        let start = Instant::now();
        let mut m = monitor(start);
        m.record_activity(start + Duration::from_secs(50));
        assert_eq!(m.check(start + Duration::from_secs(70)), None);
        assert_eq!(
            m.check(start + Duration::from_secs(110)),
            Some(PresenceAction::RaisePrompt)
        );
    }

    #[test]
    fn test_pause_in_flight_suppresses_everything() {
        let start = Instant::now();
        let mut m = monitor(start);
        m.pause_requested();
        assert_eq!(m.check(start + Duration::from_secs(600)), None);
        m.pause_cleared(start + Duration::from_secs(600));
        assert_eq!(m.check(start + Duration::from_secs(601)), None);
    }
}
