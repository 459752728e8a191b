//! Board position wrapper with legality validation and SAN generation.

use cozy_chess::{Board, Color, File, GameStatus, Move, Piece, Square};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::square::{file_char, format_square, parse_piece, parse_square, rank_char};
use crate::uci::convert_uci_castling_to_cozy;

/// A board position the engine can validate and apply moves against.
///
/// Always constructed from the current authoritative FEN; the engine
/// never trusts a locally mutated position across authoritative events.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
}

/// Everything the engine needs to know about a move it just applied.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub mv: Move,
    pub san: String,
    pub uci: String,
    pub fen_before: String,
    pub fen_after: String,
    pub captured: Option<Piece>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("No legal move matches SAN {0:?}")]
    UnknownSan(String),
    #[error(transparent)]
    Fen(#[from] FenError),
}

impl Position {
    /// Standard starting position.
    pub fn starting() -> Self {
        Self {
            board: Board::default(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        Ok(Self {
            board: parse_fen(fen)?,
        })
    }

    pub fn fen(&self) -> String {
        format_fen(&self.board)
    }

    /// True when white is to move.
    pub fn white_to_move(&self) -> bool {
        self.board.side_to_move() == Color::White
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Validate and apply a move given as endpoint squares plus an
    /// optional promotion letter. Accepts UCI castling notation (e1g1)
    /// as well as cozy's king-takes-rook form.
    pub fn apply_uci(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> Result<AppliedMove, RulesError> {
        let from_sq =
            parse_square(from).ok_or_else(|| RulesError::InvalidSquare(from.to_string()))?;
        let to_sq = parse_square(to).ok_or_else(|| RulesError::InvalidSquare(to.to_string()))?;
        let promo = promotion
            .map(|c| parse_piece(c).ok_or(RulesError::InvalidPromotion(c.to_string())))
            .transpose()?;

        let legal = self.legal_moves();
        let mv = convert_uci_castling_to_cozy(
            Move {
                from: from_sq,
                to: to_sq,
                promotion: promo,
            },
            &legal,
        );

        if !legal.contains(&mv) {
            return Err(RulesError::IllegalMove(format!("{}{}", from, to)));
        }

        Ok(self.apply_legal(mv, &legal))
    }

    /// Apply a move given in SAN. Used when replaying a persisted
    /// history through the rules engine.
    pub fn apply_san(&mut self, san: &str) -> Result<AppliedMove, RulesError> {
        let wanted = san.trim_end_matches(['+', '#', '!', '?']);
        let legal = self.legal_moves();
        let mv = legal
            .iter()
            .copied()
            .find(|mv| bare_san(&self.board, *mv, &legal) == wanted)
            .ok_or_else(|| RulesError::UnknownSan(san.to_string()))?;
        Ok(self.apply_legal(mv, &legal))
    }

    fn apply_legal(&mut self, mv: Move, legal: &[Move]) -> AppliedMove {
        let fen_before = self.fen();
        let san_base = bare_san(&self.board, mv, legal);
        let uci = standard_uci(&self.board, mv);
        let captured = if self.board.color_on(mv.to) == Some(self.board.side_to_move()) {
            None // castling, king "takes" own rook
        } else {
            self.board.piece_on(mv.to)
        };

        let mut next = self.board.clone();
        next.play_unchecked(mv);

        let is_check = !next.checkers().is_empty();
        let status = next.status();
        let is_checkmate = status == GameStatus::Won;
        let is_stalemate = status == GameStatus::Drawn && !is_check && {
            let mut any = false;
            next.generate_moves(|_| {
                any = true;
                true
            });
            !any
        };

        self.board = next;

        let mut san = san_base;
        if is_checkmate {
            san.push('#');
        } else if is_check {
            san.push('+');
        }

        AppliedMove {
            mv,
            san,
            uci,
            fen_before,
            fen_after: self.fen(),
            captured,
            is_check,
            is_checkmate,
            is_stalemate,
        }
    }
}

/// SAN without check/mate suffix (those need the post-move position).
fn bare_san(board: &Board, mv: Move, legal: &[Move]) -> String {
    let piece = match board.piece_on(mv.from) {
        Some(p) => p,
        None => return standard_uci(board, mv),
    };

    // Castling: cozy encodes it as king takes own rook.
    if piece == Piece::King && board.color_on(mv.to) == Some(board.side_to_move()) {
        return if mv.to.file() > mv.from.file() {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        };
    }

    let is_capture = board.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    match piece {
        Piece::Pawn => {
            if is_capture {
                san.push(file_char(mv.from.file()));
            }
        }
        Piece::Knight => san.push('N'),
        Piece::Bishop => san.push('B'),
        Piece::Rook => san.push('R'),
        Piece::Queen => san.push('Q'),
        Piece::King => san.push('K'),
    }

    if matches!(
        piece,
        Piece::Knight | Piece::Bishop | Piece::Rook | Piece::Queen
    ) {
        san.push_str(&disambiguation(board, mv, piece, legal));
    }

    if is_capture {
        san.push('x');
    }

    san.push_str(&format_square(mv.to));

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(match promo {
            Piece::Queen => 'Q',
            Piece::Rook => 'R',
            Piece::Bishop => 'B',
            Piece::Knight => 'N',
            _ => '?',
        });
    }

    san
}

/// Minimal origin qualifier when another identical piece can reach the
/// same destination: file if unique, else rank, else both.
fn disambiguation(board: &Board, mv: Move, piece: Piece, legal: &[Move]) -> String {
    let rivals: Vec<Square> = legal
        .iter()
        .filter(|other| {
            other.to == mv.to && other.from != mv.from && board.piece_on(other.from) == Some(piece)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let file_clash = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let rank_clash = rivals.iter().any(|sq| sq.rank() == mv.from.rank());

    if !file_clash {
        file_char(mv.from.file()).to_string()
    } else if !rank_clash {
        rank_char(mv.from.rank()).to_string()
    } else {
        format_square(mv.from)
    }
}

/// UCI with standard castling endpoints (e1g1, not cozy's e1h1).
fn standard_uci(board: &Board, mv: Move) -> String {
    let piece = board.piece_on(mv.from);
    if piece == Some(Piece::King) && board.color_on(mv.to) == Some(board.side_to_move()) {
        let to_file = if mv.to.file() > mv.from.file() {
            File::G
        } else {
            File::C
        };
        let to = Square::new(to_file, mv.from.rank());
        return format!("{}{}", format_square(mv.from), format_square(to));
    }
    crate::uci::format_uci_move(mv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_uci_basic() {
        let mut pos = Position::starting();
        let applied = pos.apply_uci("e2", "e4", None).unwrap();
        assert_eq!(applied.san, "e4");
        assert_eq!(applied.uci, "e2e4");
        assert!(!pos.white_to_move());
        assert_ne!(applied.fen_before, applied.fen_after);
    }

    #[test]
    fn test_apply_uci_rejects_illegal() {
        let mut pos = Position::starting();
        let before = pos.fen();
        assert!(pos.apply_uci("e2", "e5", None).is_err());
        assert_eq!(pos.fen(), before, "failed apply must not mutate");
    }

    #[test]
    fn test_capture_san() {
        let mut pos = Position::starting();
        pos.apply_uci("e2", "e4", None).unwrap();
        pos.apply_uci("d7", "d5", None).unwrap();
        let applied = pos.apply_uci("e4", "d5", None).unwrap();
        assert_eq!(applied.san, "exd5");
        assert_eq!(applied.captured, Some(Piece::Pawn));
    }

    #[test]
    fn test_castling_uci_and_san() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let applied = pos.apply_uci("e1", "g1", None).unwrap();
        assert_eq!(applied.san, "O-O");
        assert_eq!(applied.uci, "e1g1");
    }

    #[test]
    fn test_queenside_castling_san() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1").unwrap();
        let applied = pos.apply_uci("e8", "c8", None).unwrap();
        assert_eq!(applied.san, "O-O-O");
    }

    #[test]
    fn test_knight_file_disambiguation() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
        let applied = pos.apply_uci("b1", "d2", None).unwrap();
        assert_eq!(applied.san, "Nbd2");
    }

    #[test]
    fn test_rook_rank_disambiguation() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/R7/8/R3K3 w - - 0 1").unwrap();
        let applied = pos.apply_uci("a1", "a2", None).unwrap();
        assert_eq!(applied.san, "R1a2");
    }

    #[test]
    fn test_check_suffix() {
        let mut pos = Position::from_fen("k7/8/8/8/8/8/8/K2Q4 w - - 0 1").unwrap();
        let applied = pos.apply_uci("d1", "d8", None).unwrap();
        assert_eq!(applied.san, "Qd8+");
        assert!(applied.is_check);
        assert!(!applied.is_checkmate);
    }

    #[test]
    fn test_scholars_mate_flags() {
        let mut pos = Position::starting();
        for (from, to) in [
            ("e2", "e4"),
            ("e7", "e5"),
            ("f1", "c4"),
            ("b8", "c6"),
            ("d1", "h5"),
            ("g8", "f6"),
        ] {
            pos.apply_uci(from, to, None).unwrap();
        }
        let mate = pos.apply_uci("h5", "f7", None).unwrap();
        assert_eq!(mate.san, "Qxf7#");
        assert!(mate.is_checkmate);
        assert!(!mate.is_stalemate);
    }

    #[test]
    fn test_promotion_san() {
        let mut pos = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let applied = pos.apply_uci("a7", "a8", Some('q')).unwrap();
        assert_eq!(applied.san, "a8=Q");
        assert_eq!(applied.uci, "a7a8q");
    }

    #[test]
    fn test_stalemate_flag() {
        // Black king a8, white queen to c7 stalemates.
        let mut pos = Position::from_fen("k7/8/8/8/8/8/2Q5/K7 w - - 0 1").unwrap();
        let applied = pos.apply_uci("c2", "c7", None).unwrap();
        assert!(applied.is_stalemate, "expected stalemate, got {:?}", applied);
        assert!(!applied.is_check);
    }

    #[test]
    fn test_san_replay_reproduces_fen() {
        // Round-trip law: replaying the SAN sequence reproduces the
        // final FEN produced by endpoint-based application.
        let mut original = Position::starting();
        let moves = [
            ("e2", "e4"),
            ("c7", "c5"),
            ("g1", "f3"),
            ("d7", "d6"),
            ("d2", "d4"),
            ("c5", "d4"),
            ("f3", "d4"),
            ("g8", "f6"),
        ];
        let mut sans = Vec::new();
        for (from, to) in moves {
            sans.push(original.apply_uci(from, to, None).unwrap().san);
        }

        let mut replayed = Position::starting();
        for san in &sans {
            replayed.apply_san(san).unwrap();
        }
        assert_eq!(replayed.fen(), original.fen());
    }

    #[test]
    fn test_apply_san_unknown() {
        let mut pos = Position::starting();
        assert!(matches!(
            pos.apply_san("Qxf7#"),
            Err(RulesError::UnknownSan(_))
        ));
    }
}
