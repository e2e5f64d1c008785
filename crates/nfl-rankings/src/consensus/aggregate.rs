// Consensus aggregation: average player-only rank across every submitted
// ranking for one (position, week) bucket.

use std::collections::HashMap;

use serde::Serialize;

use crate::ranking::{player_ranks, Player, PlayerId, PlayerRef, RankingItem};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's line in the consensus ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusEntry {
    pub player: PlayerRef,
    pub average_rank: f64,
    pub min_rank: u32,
    pub max_rank: u32,
    /// Number of rankings containing this player.
    pub rank_count: u32,
    /// 1-based position in the consensus ordering.
    pub consensus_rank: u32,
}

/// Consensus ordering for one bucket. Entries are sorted ascending by
/// `average_rank`; players nobody ranked are absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsensusResult {
    pub entries: Vec<ConsensusEntry>,
    /// Number of rankings the result was computed from.
    pub submissions: usize,
    #[serde(skip)]
    index: HashMap<PlayerId, usize>,
}

impl ConsensusResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: PlayerId) -> Option<&ConsensusEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn consensus_rank_of(&self, id: PlayerId) -> Option<u32> {
        self.get(id).map(|e| e.consensus_rank)
    }
}

// ---------------------------------------------------------------------------
// Per-player accumulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct PlayerStats {
    pub player: PlayerRef,
    pub rank_sum: u64,
    pub rank_count: u32,
    pub min_rank: u32,
    pub max_rank: u32,
}

impl PlayerStats {
    fn new(player: PlayerRef) -> Self {
        PlayerStats {
            player,
            rank_sum: 0,
            rank_count: 0,
            min_rank: u32::MAX,
            max_rank: 0,
        }
    }

    fn record(&mut self, rank: u32) {
        self.rank_sum += u64::from(rank);
        self.rank_count += 1;
        self.min_rank = self.min_rank.min(rank);
        self.max_rank = self.max_rank.max(rank);
    }

    pub fn average_rank(&self) -> Option<f64> {
        (self.rank_count > 0).then(|| self.rank_sum as f64 / f64::from(self.rank_count))
    }
}

/// Stats records in seed order: roster order first, then players that only
/// appear in rankings, in the order they were first seen.
#[derive(Debug, Default)]
pub(crate) struct StatsTable {
    records: Vec<PlayerStats>,
    by_id: HashMap<PlayerId, usize>,
}

impl StatsTable {
    pub fn seeded(roster: &[Player]) -> Self {
        let mut table = StatsTable::default();
        for player in roster {
            if table.by_id.contains_key(&player.id) {
                continue;
            }
            table.by_id.insert(player.id, table.records.len());
            table.records.push(PlayerStats::new(PlayerRef::from(player)));
        }
        table
    }

    /// Add one ranking's contribution.
    pub fn record_ranking(&mut self, items: &[RankingItem]) {
        for (player, rank) in player_ranks(items) {
            let idx = match self.by_id.get(&player.id) {
                Some(&idx) => idx,
                None => {
                    let idx = self.records.len();
                    self.by_id.insert(player.id, idx);
                    self.records.push(PlayerStats::new(player.clone()));
                    idx
                }
            };
            self.records[idx].record(rank);
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerStats> {
        self.by_id.get(&id).map(|&i| &self.records[i])
    }

    pub fn into_records(self) -> Vec<PlayerStats> {
        self.records
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Compute the consensus ordering for one (position, week) bucket.
///
/// `roster` seeds the stats table and supplies display fields; players
/// referenced by rankings but missing from the roster are still counted,
/// using the snapshot from the first ranking item that referenced them.
///
/// Ties on `average_rank` keep seed order (the sort is stable).
pub fn compute_consensus<R>(roster: &[Player], rankings: &[R]) -> ConsensusResult
where
    R: AsRef<[RankingItem]>,
{
    let mut table = StatsTable::seeded(roster);
    for ranking in rankings {
        table.record_ranking(ranking.as_ref());
    }

    let mut entries: Vec<ConsensusEntry> = table
        .into_records()
        .into_iter()
        .filter_map(|stats| {
            let average_rank = stats.average_rank()?;
            Some(ConsensusEntry {
                player: stats.player,
                average_rank,
                min_rank: stats.min_rank,
                max_rank: stats.max_rank,
                rank_count: stats.rank_count,
                consensus_rank: 0,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.average_rank.total_cmp(&b.average_rank));

    let mut index = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.consensus_rank = i as u32 + 1;
        index.insert(entry.player.id, i);
    }

    ConsensusResult {
        entries,
        submissions: rankings.len(),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::testutil::{player, ranking, roster, tier};

    fn order(result: &ConsensusResult) -> Vec<i64> {
        result.entries.iter().map(|e| e.player.id.0).collect()
    }

    #[test]
    fn average_of_player_only_positions() {
        let roster = roster(&[1, 2, 3]);
        let rankings = vec![
            ranking(&[1, 2, 3]),
            ranking(&[3, 1, 2]),
            ranking(&[1, 3, 2]),
        ];
        let result = compute_consensus(&roster, &rankings);

        let p1 = result.get(PlayerId(1)).unwrap();
        assert!((p1.average_rank - (1.0 + 2.0 + 1.0) / 3.0).abs() < 1e-9);
        assert_eq!(p1.min_rank, 1);
        assert_eq!(p1.max_rank, 2);
        assert_eq!(p1.rank_count, 3);

        let p2 = result.get(PlayerId(2)).unwrap();
        assert!((p2.average_rank - (2.0 + 3.0 + 3.0) / 3.0).abs() < 1e-9);
        let p3 = result.get(PlayerId(3)).unwrap();
        assert!((p3.average_rank - (3.0 + 1.0 + 2.0) / 3.0).abs() < 1e-9);

        assert_eq!(order(&result), vec![1, 3, 2]);
        assert_eq!(result.submissions, 3);
    }

    #[test]
    fn tier_markers_do_not_shift_ranks() {
        let roster = roster(&[1, 2, 3]);
        let plain = vec![ranking(&[2, 1, 3])];
        let tiered = vec![vec![
            tier("Elite"),
            player(2),
            tier("Good"),
            tier("Also good"),
            player(1),
            player(3),
            tier("Trailing"),
        ]];

        let a = compute_consensus(&roster, &plain);
        let b = compute_consensus(&roster, &tiered);
        assert_eq!(a.entries, b.entries);
    }

    #[test]
    fn empty_rankings_yield_empty_result() {
        let result = compute_consensus::<Vec<RankingItem>>(&roster(&[1, 2, 3]), &[]);
        assert!(result.is_empty());
        assert_eq!(result.submissions, 0);

        let no_roster = compute_consensus::<Vec<RankingItem>>(&[], &[]);
        assert!(no_roster.is_empty());
    }

    #[test]
    fn unranked_roster_players_are_omitted() {
        let roster = roster(&[1, 2, 3, 4]);
        let result = compute_consensus(&roster, &[ranking(&[2, 1])]);
        assert_eq!(result.len(), 2);
        assert!(result.get(PlayerId(3)).is_none());
        assert!(result.get(PlayerId(4)).is_none());
    }

    #[test]
    fn players_missing_from_roster_are_counted_from_snapshot() {
        let roster = roster(&[1]);
        let ghost = RankingItem::Player(PlayerRef {
            id: PlayerId(99),
            name: "Traded Away".into(),
            team: "OLD".into(),
            opponent: "NYJ".into(),
        });
        let rankings = vec![
            vec![ghost.clone(), player(1)],
            vec![player(1), ghost],
        ];
        let result = compute_consensus(&roster, &rankings);

        let entry = result.get(PlayerId(99)).unwrap();
        assert_eq!(entry.player.name, "Traded Away");
        assert_eq!(entry.player.team, "OLD");
        assert_eq!(entry.rank_count, 2);
        assert!((entry.average_rank - 1.5).abs() < 1e-9);
    }

    #[test]
    fn roster_supplies_display_fields_for_known_players() {
        let roster = roster(&[5]);
        let stale = RankingItem::Player(PlayerRef {
            id: PlayerId(5),
            name: "Old Name".into(),
            team: "OLD".into(),
            opponent: "OLD".into(),
        });
        let result = compute_consensus(&roster, &[vec![stale]]);
        assert_eq!(result.entries[0].player.name, "Player 5");
    }

    #[test]
    fn ties_keep_roster_order() {
        // U1 = [P1, P2, P3], U2 = [P2, P1, P3]: P1 and P2 both average 1.5.
        let roster = roster(&[1, 2, 3]);
        let rankings = vec![ranking(&[1, 2, 3]), ranking(&[2, 1, 3])];
        let result = compute_consensus(&roster, &rankings);

        assert!((result.get(PlayerId(1)).unwrap().average_rank - 1.5).abs() < 1e-9);
        assert!((result.get(PlayerId(2)).unwrap().average_rank - 1.5).abs() < 1e-9);
        assert!((result.get(PlayerId(3)).unwrap().average_rank - 3.0).abs() < 1e-9);
        assert_eq!(order(&result), vec![1, 2, 3]);
        assert_eq!(result.consensus_rank_of(PlayerId(3)), Some(3));
    }

    #[test]
    fn consensus_rank_is_monotonic_in_average() {
        let roster = roster(&[1, 2, 3, 4, 5]);
        let rankings = vec![
            ranking(&[5, 4, 3, 2, 1]),
            ranking(&[1, 2, 3, 4, 5]),
            ranking(&[3, 5, 1, 4]),
            ranking(&[2]),
        ];
        let result = compute_consensus(&roster, &rankings);
        for a in &result.entries {
            for b in &result.entries {
                if a.average_rank < b.average_rank {
                    assert!(a.consensus_rank < b.consensus_rank);
                }
            }
        }
        let ranks: Vec<u32> = result.entries.iter().map(|e| e.consensus_rank).collect();
        assert_eq!(ranks, (1..=result.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn one_users_empty_ranking_does_not_disturb_others() {
        let roster = roster(&[1, 2]);
        let rankings = vec![ranking(&[2, 1]), Vec::new()];
        let result = compute_consensus(&roster, &rankings);
        assert_eq!(order(&result), vec![2, 1]);
        assert_eq!(result.get(PlayerId(2)).unwrap().rank_count, 1);
    }
}
