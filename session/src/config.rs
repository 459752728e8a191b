//! Engine tuning knobs.
//!
//! Clock parameters (initial time, increment) are server-owned and
//! arrive with the session fetch; this config only covers local
//! behavior. The presence threshold can be overridden with the
//! `LIVECHESS_PRESENCE_TIMEOUT_SECS` environment variable.

use std::time::Duration;

const PRESENCE_TIMEOUT_ENV: &str = "LIVECHESS_PRESENCE_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time before the presence prompt is raised.
    pub presence_timeout: Duration,
    /// How long the presence prompt waits before requesting a pause.
    pub prompt_countdown: Duration,
    /// Advisory TTL for resume requests when the server omits one.
    pub resume_ttl: Duration,
    /// Backoff schedule for auto-resume attempts. Length bounds the
    /// number of attempts before the manual retry control is exposed.
    pub auto_resume_backoff: Vec<Duration>,
    /// How long a move-evaluation dedup key is remembered.
    pub dedup_ttl: Duration,
    /// Remaining time under which the clock-low sound hook fires.
    pub clock_low_ms: u64,
    /// Local clock tick and presence check cadence.
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            presence_timeout: Duration::from_secs(60),
            prompt_countdown: Duration::from_secs(15),
            resume_ttl: Duration::from_secs(10),
            auto_resume_backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            dedup_ttl: Duration::from_secs(10),
            clock_low_ms: 10_000,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl SessionConfig {
    /// Default config with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(secs) = std::env::var(PRESENCE_TIMEOUT_ENV) {
            if let Ok(secs) = secs.parse::<u64>() {
                config.presence_timeout = Duration::from_secs(secs);
            }
        }
        config
    }
}
