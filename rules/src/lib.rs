//! Rules adapter for the live session engine.
//!
//! Wraps cozy-chess behind the narrow interface the engine consumes:
//! FEN handling, legality validation, SAN/UCI notation, and post-move
//! flags. cozy-chess types stay internal to this crate's callers where
//! possible; squares and moves cross the boundary as strings.

pub mod fen;
pub mod position;
pub mod square;
pub mod uci;

pub use fen::{format_fen, parse_fen, FenError, STARTING_FEN};
pub use position::{AppliedMove, Position, RulesError};
pub use square::{format_piece, format_square, parse_piece, parse_square};
pub use uci::{convert_uci_castling_to_cozy, format_uci_move};
