// Player positions that partition rosters and rankings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four rankable offensive positions. Anything else is rejected at the
/// request boundary before it reaches storage or the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    /// All positions in display order.
    pub const ALL: [Position; 4] = [Position::QB, Position::RB, Position::WR, Position::TE];

    /// Parse a position string. Case-insensitive; surrounding whitespace is
    /// ignored.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => None,
        }
    }

    /// Return the display string for this position (also the storage key).
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_positions_case_insensitively() {
        assert_eq!(Position::from_str_pos("QB"), Some(Position::QB));
        assert_eq!(Position::from_str_pos("rb"), Some(Position::RB));
        assert_eq!(Position::from_str_pos(" Wr "), Some(Position::WR));
        assert_eq!(Position::from_str_pos("te"), Some(Position::TE));
    }

    #[test]
    fn rejects_positions_outside_the_set() {
        for bad in ["K", "DST", "", "QBB", "FLEX"] {
            assert_eq!(Position::from_str_pos(bad), None, "{bad} should be rejected");
        }
    }

    #[test]
    fn display_matches_storage_key() {
        for pos in Position::ALL {
            assert_eq!(Position::from_str_pos(&pos.to_string()), Some(pos));
        }
    }

    #[test]
    fn serde_uses_uppercase_string() {
        assert_eq!(serde_json::to_string(&Position::WR).unwrap(), "\"WR\"");
        let pos: Position = serde_json::from_str("\"TE\"").unwrap();
        assert_eq!(pos, Position::TE);
    }
}
