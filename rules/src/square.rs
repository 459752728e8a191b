//! String conversions for squares and pieces.

use cozy_chess::{File, Piece, Rank, Square};

/// Parse a square like "e4". Returns None on anything else.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Format a square as "e4".
pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), sq.rank() as u8 + 1)
}

pub fn parse_file(c: char) -> Option<File> {
    match c.to_ascii_lowercase() {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

pub fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

/// Parse a piece letter (case-insensitive), e.g. 'q' for queen.
pub fn parse_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'p' => Some(Piece::Pawn),
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        'k' => Some(Piece::King),
        _ => None,
    }
}

/// Lowercase piece letter, UCI style.
pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_square_valid() {
        let sq = parse_square("e4").unwrap();
        assert_eq!(sq.file(), File::E);
        assert_eq!(sq.rank(), Rank::Fourth);
    }

    #[test]
    fn test_parse_square_invalid() {
        assert!(parse_square("z9").is_none());
        assert!(parse_square("e").is_none());
        assert!(parse_square("e44").is_none());
    }

    #[test]
    fn test_format_square_round_trip() {
        for s in ["a1", "h8", "e4", "d5"] {
            assert_eq!(format_square(parse_square(s).unwrap()), s);
        }
    }

    #[test]
    fn test_parse_piece() {
        assert_eq!(parse_piece('q'), Some(Piece::Queen));
        assert_eq!(parse_piece('Q'), Some(Piece::Queen));
        assert_eq!(parse_piece('x'), None);
    }
}
