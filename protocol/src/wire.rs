//! Compact move-list encoding: `SAN,elapsedSeconds` pairs joined by `;`.
//!
//! Used for persisted histories where the verbose descriptor would be
//! wasteful. Example: `e4,5;e5,3;Nf3,12`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("Empty move entry at index {0}")]
    EmptyEntry(usize),
    #[error("Malformed move entry at index {index}: {entry:?}")]
    MalformedEntry { index: usize, entry: String },
    #[error("Invalid elapsed seconds in entry {index}: {value:?}")]
    InvalidElapsed { index: usize, value: String },
}

/// One entry of the compact encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactMove {
    pub san: String,
    pub elapsed_s: u64,
}

/// Encode `(SAN, elapsed seconds)` pairs into the compact form.
pub fn encode_moves<'a, I>(moves: I) -> String
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    moves
        .into_iter()
        .map(|(san, elapsed)| format!("{},{}", san, elapsed))
        .collect::<Vec<_>>()
        .join(";")
}

/// Decode the compact form. The empty string decodes to an empty list.
pub fn decode_moves(encoded: &str) -> Result<Vec<CompactMove>, WireError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    encoded
        .split(';')
        .enumerate()
        .map(|(index, entry)| {
            if entry.is_empty() {
                return Err(WireError::EmptyEntry(index));
            }
            let (san, elapsed) =
                entry
                    .rsplit_once(',')
                    .ok_or_else(|| WireError::MalformedEntry {
                        index,
                        entry: entry.to_string(),
                    })?;
            if san.is_empty() {
                return Err(WireError::MalformedEntry {
                    index,
                    entry: entry.to_string(),
                });
            }
            let elapsed_s = elapsed
                .parse::<u64>()
                .map_err(|_| WireError::InvalidElapsed {
                    index,
                    value: elapsed.to_string(),
                })?;
            Ok(CompactMove {
                san: san.to_string(),
                elapsed_s,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_basic() {
        let encoded = encode_moves([("e4", 5), ("e5", 3), ("Nf3", 12)]);
        assert_eq!(encoded, "e4,5;e5,3;Nf3,12");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_moves([]), "");
    }

    #[test]
    fn test_decode_basic() {
        let moves = decode_moves("e4,5;e5,3").unwrap();
        assert_eq!(
            moves,
            vec![
                CompactMove {
                    san: "e4".into(),
                    elapsed_s: 5
                },
                CompactMove {
                    san: "e5".into(),
                    elapsed_s: 3
                },
            ]
        );
    }

    #[test]
    fn test_decode_empty_string() {
        assert_eq!(decode_moves("").unwrap(), Vec::new());
    }

    #[test]
    fn test_decode_rejects_missing_elapsed() {
        assert!(matches!(
            decode_moves("e4"),
            Err(WireError::MalformedEntry { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_elapsed() {
        assert!(matches!(
            decode_moves("e4,fast"),
            Err(WireError::InvalidElapsed { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_entry() {
        assert_eq!(decode_moves("e4,5;;e5,3"), Err(WireError::EmptyEntry(1)));
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let original = "d4,8;Nf6,4;c4,15;e6,9";
        let decoded = decode_moves(original).unwrap();
        let encoded = encode_moves(decoded.iter().map(|m| (m.san.as_str(), m.elapsed_s)));
        assert_eq!(encoded, original);
    }
}
