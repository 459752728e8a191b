//! Wire-level types for the live chess session protocol.
//!
//! Everything the engine exchanges with a server lives here: the closed
//! union of inbound events, the outbound move descriptor and clock
//! snapshot, and the compact move-list encoding. Transport
//! implementations validate payloads against these types before the
//! engine ever sees them.

pub mod descriptor;
pub mod event;
pub mod types;
pub mod wire;

pub use descriptor::{ClockSnapshot, GameSummary, MoveDescriptor, MoveRecord, PlayerInfo};
pub use event::{decode_event, encode_event, ConnectionKind, ServerEvent};
pub use types::{EndReason, GameResult, PlayerColor, ResumeOutcome, SessionStatus};
pub use wire::{decode_moves, encode_moves, CompactMove, WireError};
