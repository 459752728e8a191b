//! Non-transport collaborator ports: move scoring, persistence of
//! finished games, and sound effects.

use std::sync::Arc;

use async_trait::async_trait;

use live_protocol::GameSummary;

/// External move-quality scoring function. The engine calls it, it does
/// not define it.
pub trait MoveEvaluator: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        &self,
        san: &str,
        fen_before: &str,
        fen_after: &str,
        elapsed_s: f64,
        baseline_rating: u32,
        difficulty_factor: f64,
    ) -> f64;
}

/// Evaluator that scores every move zero. Useful for tests and casual
/// sessions without scoring.
pub struct NullEvaluator;

impl MoveEvaluator for NullEvaluator {
    fn evaluate(&self, _: &str, _: &str, _: &str, _: f64, _: u32, _: f64) -> f64 {
        0.0
    }
}

/// Accepts the normalized finished-session payload. Failures are
/// logged by the engine, never retried, never fatal.
#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn persist(&self, summary: GameSummary) -> anyhow::Result<()>;
}

/// Sink that drops summaries.
pub struct NullSummarySink;

#[async_trait]
impl SummarySink for NullSummarySink {
    async fn persist(&self, _summary: GameSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Per-session audio port. Acquired once per session and injected; its
/// lifecycle is the session's lifecycle. All hooks default to no-ops so
/// implementations opt into the cues they care about.
pub trait SoundEffects: Send + Sync {
    fn move_played(&self) {}
    fn game_ended(&self) {}
    fn clock_low(&self) {}
}

/// Silent default.
pub struct NoSound;

impl SoundEffects for NoSound {}

/// The non-transport collaborators bundled for injection.
#[derive(Clone)]
pub struct SessionPorts {
    pub evaluator: Arc<dyn MoveEvaluator>,
    pub summaries: Arc<dyn SummarySink>,
    pub sounds: Arc<dyn SoundEffects>,
}

impl SessionPorts {
    /// All-null ports: no scoring, no persistence, no sound.
    pub fn null() -> Self {
        Self {
            evaluator: Arc::new(NullEvaluator),
            summaries: Arc::new(NullSummarySink),
            sounds: Arc::new(NoSound),
        }
    }
}
