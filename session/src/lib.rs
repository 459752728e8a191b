//! Client-side synchronization engine for live two-player chess.
//!
//! One actor task per session owns all mutable state and serializes
//! local commands, server events, clock ticks, and presence checks
//! through a single `select!` loop. Consumers hold a cheap
//! [`SessionHandle`] and observe the session through immutable
//! [`SessionView`] snapshots and [`EngineEvent`] broadcasts.
//!
//! The server is authoritative for everything: moves are applied
//! optimistically and reconciled by overwrite when the authoritative
//! echo arrives, clocks are rebased from move-history data, and
//! pause/resume is a negotiated handshake rather than a local decision.

mod actor;
pub mod clock;
mod commands;
pub mod config;
pub mod error;
mod handle;
pub mod launcher;
pub mod ports;
pub mod presence;
pub mod resume;
mod state;
pub mod transport;
pub mod view;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::SessionConfig;
pub use error::{MoveRejection, SessionError, SessionResult};
pub use handle::SessionHandle;
pub use launcher::{start_session, SessionLauncher};
pub use ports::{
    MoveEvaluator, NoSound, NullEvaluator, NullSummarySink, SessionPorts, SoundEffects,
    SummarySink,
};
pub use transport::{
    ResumeRequestStatus, SessionInfo, Transport, TransportError, TransportResult,
};
pub use view::{EngineEvent, ResumeView, SessionView};
