// Consensus with tier placement.
//
// A secondary view on top of the primary consensus: every item, tier
// markers included, contributes its 1-based overall position. Tiers become
// pseudo-entities keyed by tier name, so "Tier 1" from two different users
// averages into one row. Entities are listed by average overall position.

use std::collections::HashMap;

use serde::Serialize;

use super::aggregate::StatsTable;
use crate::ranking::{Player, PlayerId, PlayerRef, RankingItem};

/// Primary-consensus stats carried on player rows of the tiered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummaryStats {
    pub average_rank: f64,
    pub min_rank: u32,
    pub max_rank: u32,
    pub rank_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TieredEntry {
    Tier {
        name: String,
        average_position: f64,
        appearances: u32,
    },
    Player {
        player: PlayerRef,
        average_position: f64,
        appearances: u32,
        /// Rank among player rows of this view, in view order.
        display_rank: u32,
        stats: PlayerSummaryStats,
    },
}

impl TieredEntry {
    pub fn average_position(&self) -> f64 {
        match self {
            TieredEntry::Tier { average_position, .. }
            | TieredEntry::Player { average_position, .. } => *average_position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntityKey {
    Player(PlayerId),
    Tier(String),
}

#[derive(Debug)]
enum EntityKind {
    Player(PlayerRef),
    Tier(String),
}

#[derive(Debug)]
struct Entity {
    kind: EntityKind,
    position_sum: u64,
    appearances: u32,
}

#[derive(Debug, Default)]
struct EntityTable {
    entities: Vec<Entity>,
    by_key: HashMap<EntityKey, usize>,
}

impl EntityTable {
    fn slot(&mut self, key: EntityKey, kind: impl FnOnce() -> EntityKind) -> &mut Entity {
        let idx = match self.by_key.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.entities.len();
                self.entities.push(Entity {
                    kind: kind(),
                    position_sum: 0,
                    appearances: 0,
                });
                self.by_key.insert(key, idx);
                idx
            }
        };
        &mut self.entities[idx]
    }
}

/// Compute the tier-aware consensus view for one bucket.
pub fn compute_tiered_consensus<R>(roster: &[Player], rankings: &[R]) -> Vec<TieredEntry>
where
    R: AsRef<[RankingItem]>,
{
    let mut stats = StatsTable::seeded(roster);
    let mut table = EntityTable::default();
    for player in roster {
        table.slot(EntityKey::Player(player.id), || {
            EntityKind::Player(PlayerRef::from(player))
        });
    }

    for ranking in rankings {
        let items = ranking.as_ref();
        stats.record_ranking(items);

        for (item, overall_position) in items.iter().zip(1u64..) {
            let entity = match item {
                RankingItem::Player(p) => table.slot(EntityKey::Player(p.id), || {
                    EntityKind::Player(p.clone())
                }),
                RankingItem::Tier(t) => table.slot(EntityKey::Tier(t.name.clone()), || {
                    EntityKind::Tier(t.name.clone())
                }),
            };
            entity.position_sum += overall_position;
            entity.appearances += 1;
        }
    }

    let mut placed: Vec<(f64, Entity)> = table
        .entities
        .into_iter()
        .filter(|e| e.appearances > 0)
        .map(|e| (e.position_sum as f64 / f64::from(e.appearances), e))
        .collect();
    placed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut display_rank = 0u32;
    placed
        .into_iter()
        .filter_map(|(average_position, entity)| match entity.kind {
            EntityKind::Tier(name) => Some(TieredEntry::Tier {
                name,
                average_position,
                appearances: entity.appearances,
            }),
            EntityKind::Player(player) => {
                let s = stats.get(player.id)?;
                let average_rank = s.average_rank()?;
                display_rank += 1;
                Some(TieredEntry::Player {
                    player: s.player.clone(),
                    average_position,
                    appearances: entity.appearances,
                    display_rank,
                    stats: PlayerSummaryStats {
                        average_rank,
                        min_rank: s.min_rank,
                        max_rank: s.max_rank,
                        rank_count: s.rank_count,
                    },
                })
            }
        })
        .collect()
}
