// Ranking items: the ordered tier/player sequence a user submits.
//
// Wire format (persisted verbatim as the ranking body):
//   [{"type":"tier","id":"tier-1","name":"Tier 1"},
//    {"type":"player","id":42,"name":"...","team":"...","opponent":"..."}]

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

use super::player::Player;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Roster row identifier. Unique within a (position, week) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Browsers have submitted ids both as numbers and as numeric strings
/// (DOM `data-id` attributes), so both are accepted.
impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Ok(PlayerId(n)),
            RawId::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(PlayerId)
                .map_err(|_| serde::de::Error::custom(format!("non-numeric player id '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A presentational group label. Carries no player identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMarker {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A player reference with the display fields captured at ranking time.
/// The roster may change afterwards; this snapshot is what gets shown for
/// players no longer on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub opponent: String,
}

impl From<&Player> for PlayerRef {
    fn from(p: &Player) -> Self {
        PlayerRef {
            id: p.id,
            name: p.name.clone(),
            team: p.team.clone(),
            opponent: p.opponent.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RankingItem {
    Tier(TierMarker),
    Player(PlayerRef),
}

impl RankingItem {
    pub fn as_player(&self) -> Option<&PlayerRef> {
        match self {
            RankingItem::Player(p) => Some(p),
            RankingItem::Tier(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("ranking data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ranking data must be a JSON array, got {0}")]
    NotAnArray(&'static str),
}

// ---------------------------------------------------------------------------
// Decoding / encoding
// ---------------------------------------------------------------------------

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Decode a persisted ranking body.
///
/// Each element is decoded on its own: an element with a missing or unknown
/// `type`, or a player without a usable id, is skipped with a warning while
/// the rest of the ranking survives.
pub fn parse_ranking_items(json: &str) -> Result<Vec<RankingItem>, ItemError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(elements) = value else {
        return Err(ItemError::NotAnArray(json_kind(&value)));
    };

    let mut items = Vec::with_capacity(elements.len());
    for (idx, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<RankingItem>(element) {
            Ok(item) => items.push(item),
            Err(e) => warn!("skipping malformed ranking item at index {idx}: {e}"),
        }
    }
    Ok(items)
}

/// Encode items to the wire format.
pub fn encode_ranking_items(items: &[RankingItem]) -> Result<String, ItemError> {
    Ok(serde_json::to_string(items)?)
}

/// Walk a ranking assigning each player its 1-based rank among players
/// only. Tier markers never advance the counter.
pub fn player_ranks(items: &[RankingItem]) -> impl Iterator<Item = (&PlayerRef, u32)> + '_ {
    items
        .iter()
        .filter_map(RankingItem::as_player)
        .zip(1u32..)
}

/// Tier names of the starter ranking offered to users with nothing saved.
const DEFAULT_TIERS: [(&str, &str); 6] = [
    ("tier-1", "Tier 1"),
    ("tier-2", "Tier 2"),
    ("tier-3", "Tier 3"),
    ("tier-4", "Tier 4"),
    ("tier-5", "Tier 5"),
    ("tier-rest", "The Rest"),
];

/// Starter ranking: the standard tier markers followed by the whole roster
/// in roster order.
pub fn default_ranking(roster: &[Player]) -> Vec<RankingItem> {
    DEFAULT_TIERS
        .iter()
        .map(|(id, name)| {
            RankingItem::Tier(TierMarker {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
        .chain(roster.iter().map(|p| RankingItem::Player(PlayerRef::from(p))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{Position, Week};

    fn player_ids(items: &[RankingItem]) -> Vec<i64> {
        items
            .iter()
            .filter_map(RankingItem::as_player)
            .map(|p| p.id.0)
            .collect()
    }

    #[test]
    fn decodes_tiers_and_players() {
        let json = r#"[
            {"type":"tier","id":"tier-1","name":"Elite"},
            {"type":"player","id":7,"name":"Josh Allen","team":"BUF","opponent":"MIA"}
        ]"#;
        let items = parse_ranking_items(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            RankingItem::Tier(TierMarker {
                id: "tier-1".into(),
                name: "Elite".into()
            })
        );
        let p = items[1].as_player().unwrap();
        assert_eq!(p.id, PlayerId(7));
        assert_eq!(p.team, "BUF");
        assert_eq!(p.opponent, "MIA");
    }

    #[test]
    fn accepts_string_player_ids() {
        let json = r#"[{"type":"player","id":"12","name":"A"}]"#;
        let items = parse_ranking_items(json).unwrap();
        assert_eq!(player_ids(&items), vec![12]);
    }

    #[test]
    fn skips_malformed_items_without_failing() {
        let json = r#"[
            {"type":"player","id":1,"name":"A"},
            {"id":2,"name":"no type"},
            {"type":"player","name":"no id"},
            {"type":"player","id":"abc","name":"bad id"},
            {"type":"bench","id":3},
            42,
            {"type":"player","id":4,"name":"D"}
        ]"#;
        let items = parse_ranking_items(json).unwrap();
        assert_eq!(player_ids(&items), vec![1, 4]);
    }

    #[test]
    fn rejects_non_array_bodies() {
        assert!(matches!(
            parse_ranking_items(r#"{"type":"player"}"#),
            Err(ItemError::NotAnArray("an object"))
        ));
        assert!(matches!(parse_ranking_items("not json"), Err(ItemError::Json(_))));
    }

    #[test]
    fn encodes_wire_format() {
        let items = vec![
            RankingItem::Tier(TierMarker {
                id: "t".into(),
                name: "Top".into(),
            }),
            RankingItem::Player(PlayerRef {
                id: PlayerId(3),
                name: "C".into(),
                team: "KC".into(),
                opponent: "DEN".into(),
            }),
        ];
        let json = encode_ranking_items(&items).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "tier");
        assert_eq!(value[1]["type"], "player");
        assert_eq!(value[1]["id"], 3);
        assert_eq!(parse_ranking_items(&json).unwrap(), items);
    }

    #[test]
    fn player_ranks_skip_tiers() {
        let json = r#"[
            {"type":"tier","id":"a","name":"Elite"},
            {"type":"player","id":10},
            {"type":"tier","id":"b","name":"Good"},
            {"type":"player","id":20},
            {"type":"player","id":30}
        ]"#;
        let items = parse_ranking_items(json).unwrap();
        let ranks: Vec<(i64, u32)> = player_ranks(&items).map(|(p, r)| (p.id.0, r)).collect();
        assert_eq!(ranks, vec![(10, 1), (20, 2), (30, 3)]);
    }

    #[test]
    fn default_ranking_puts_tiers_before_roster() {
        let roster: Vec<Player> = (1..=3)
            .map(|i| Player {
                id: PlayerId(i),
                name: format!("Player {i}"),
                team: "T".into(),
                opponent: "O".into(),
                position: Position::RB,
                week: Week::Regular(1),
                sort_order: i,
            })
            .collect();

        let items = default_ranking(&roster);
        assert_eq!(items.len(), 9);
        assert!(items[..6]
            .iter()
            .all(|i| matches!(i, RankingItem::Tier(_))));
        match &items[5] {
            RankingItem::Tier(t) => assert_eq!(t.name, "The Rest"),
            other => panic!("expected tier, got {other:?}"),
        }
        assert_eq!(player_ids(&items), vec![1, 2, 3]);
    }
}
