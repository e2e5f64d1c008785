// The fixed, ordered catalog of scheduling weeks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Number of regular-season weeks in the catalog.
pub const REGULAR_SEASON_WEEKS: u8 = 18;

/// A labeled scheduling bucket. Ordering follows the catalog:
/// offseason, rookies, week1 .. week18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Week {
    #[default]
    Offseason,
    Rookies,
    /// Regular-season week, 1..=18.
    Regular(u8),
}

impl Week {
    /// Parse a storage key such as `"offseason"` or `"week7"`.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        match key.as_str() {
            "offseason" => Some(Week::Offseason),
            "rookies" => Some(Week::Rookies),
            _ => {
                let n: u8 = key.strip_prefix("week")?.parse().ok()?;
                (1..=REGULAR_SEASON_WEEKS)
                    .contains(&n)
                    .then_some(Week::Regular(n))
            }
        }
    }

    /// Every week in catalog order.
    pub fn all() -> Vec<Week> {
        let mut weeks = vec![Week::Offseason, Week::Rookies];
        weeks.extend((1..=REGULAR_SEASON_WEEKS).map(Week::Regular));
        weeks
    }

    /// Storage key, e.g. `"week7"`.
    pub fn key(&self) -> String {
        match self {
            Week::Offseason => "offseason".to_string(),
            Week::Rookies => "rookies".to_string(),
            Week::Regular(n) => format!("week{n}"),
        }
    }

    /// Human-readable label, e.g. `"Week 7"`.
    pub fn label(&self) -> String {
        match self {
            Week::Offseason => "Offseason".to_string(),
            Week::Rookies => "Rookies".to_string(),
            Week::Regular(n) => format!("Week {n}"),
        }
    }

    pub fn sort_index(&self) -> u8 {
        match self {
            Week::Offseason => 0,
            Week::Rookies => 1,
            Week::Regular(n) => n + 1,
        }
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl Serialize for Week {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for Week {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Week::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown week '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twenty_weeks_in_order() {
        let weeks = Week::all();
        assert_eq!(weeks.len(), 20);
        assert_eq!(weeks[0], Week::Offseason);
        assert_eq!(weeks[1], Week::Rookies);
        assert_eq!(weeks[2], Week::Regular(1));
        assert_eq!(weeks[19], Week::Regular(18));
        assert!(weeks.windows(2).all(|w| w[0] < w[1]));
        assert!(weeks
            .windows(2)
            .all(|w| w[0].sort_index() < w[1].sort_index()));
    }

    #[test]
    fn parse_accepts_storage_keys() {
        assert_eq!(Week::parse("offseason"), Some(Week::Offseason));
        assert_eq!(Week::parse("Rookies"), Some(Week::Rookies));
        assert_eq!(Week::parse("week1"), Some(Week::Regular(1)));
        assert_eq!(Week::parse("WEEK18"), Some(Week::Regular(18)));
    }

    #[test]
    fn parse_rejects_out_of_catalog_labels() {
        for bad in ["week0", "week19", "week", "preseason", "7", ""] {
            assert_eq!(Week::parse(bad), None, "{bad} should be rejected");
        }
    }

    #[test]
    fn key_and_label() {
        assert_eq!(Week::Regular(7).key(), "week7");
        assert_eq!(Week::Regular(7).label(), "Week 7");
        assert_eq!(Week::Offseason.label(), "Offseason");
        for week in Week::all() {
            assert_eq!(Week::parse(&week.key()), Some(week));
        }
    }

    #[test]
    fn default_is_offseason() {
        assert_eq!(Week::default(), Week::Offseason);
    }

    #[test]
    fn serde_as_storage_key() {
        assert_eq!(serde_json::to_string(&Week::Regular(3)).unwrap(), "\"week3\"");
        let w: Week = serde_json::from_str("\"rookies\"").unwrap();
        assert_eq!(w, Week::Rookies);
        assert!(serde_json::from_str::<Week>("\"week40\"").is_err());
    }
}
