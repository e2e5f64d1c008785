// Per-player differential of one user's ranking against the consensus.

use serde::Serialize;

use super::aggregate::ConsensusResult;
use crate::ranking::{PlayerRef, RankingItem, TierMarker};

/// A row of a user's ranking annotated against the consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DifferentialRow {
    Tier(TierMarker),
    Player {
        player: PlayerRef,
        /// This player's 1-based position among players in the user's
        /// ranking.
        user_rank: u32,
        consensus_rank: Option<u32>,
        /// `consensus_rank - user_rank`. Positive means the user ranked the
        /// player better than the consensus. `None` when the player has no
        /// consensus rank.
        differential: Option<i64>,
    },
}

/// Annotate `ranking` with each player's gap to the consensus. Tier markers
/// pass through unchanged.
pub fn compute_differential(consensus: &ConsensusResult, ranking: &[RankingItem]) -> Vec<DifferentialRow> {
    let mut user_rank = 0u32;
    ranking
        .iter()
        .map(|item| match item {
            RankingItem::Tier(tier) => DifferentialRow::Tier(tier.clone()),
            RankingItem::Player(player) => {
                user_rank += 1;
                let consensus_rank = consensus.consensus_rank_of(player.id);
                DifferentialRow::Player {
                    player: player.clone(),
                    user_rank,
                    consensus_rank,
                    differential: consensus_rank
                        .map(|c| i64::from(c) - i64::from(user_rank)),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::compute_consensus;
    use crate::consensus::testutil::{player, ranking, roster, tier};

    fn diffs(rows: &[DifferentialRow]) -> Vec<Option<i64>> {
        rows.iter()
            .filter_map(|r| match r {
                DifferentialRow::Player { differential, .. } => Some(*differential),
                DifferentialRow::Tier(_) => None,
            })
            .collect()
    }

    #[test]
    fn sign_convention_is_consensus_minus_user() {
        // Consensus: 1, 2, 3. The user puts player 1 third.
        let roster = roster(&[1, 2, 3]);
        let consensus = compute_consensus(&roster, &[ranking(&[1, 2, 3]), ranking(&[1, 2, 3])]);
        let rows = compute_differential(&consensus, &ranking(&[2, 3, 1]));
        assert_eq!(diffs(&rows), vec![Some(1), Some(1), Some(-2)]);
    }

    #[test]
    fn tiers_pass_through_and_do_not_count() {
        let roster = roster(&[1, 2, 3]);
        let consensus = compute_consensus(&roster, &[ranking(&[1, 2, 3])]);
        let user = vec![tier("Elite"), player(1), tier("Good"), player(2), player(3)];
        let rows = compute_differential(&consensus, &user);

        assert_eq!(rows.len(), 5);
        assert!(matches!(&rows[0], DifferentialRow::Tier(t) if t.name == "Elite"));
        assert!(matches!(&rows[2], DifferentialRow::Tier(t) if t.name == "Good"));
        assert_eq!(diffs(&rows), vec![Some(0), Some(0), Some(0)]);
        match &rows[4] {
            DifferentialRow::Player { user_rank, consensus_rank, .. } => {
                assert_eq!(*user_rank, 3);
                assert_eq!(*consensus_rank, Some(3));
            }
            other => panic!("expected player row, got {other:?}"),
        }
    }

    #[test]
    fn players_without_consensus_rank_have_no_differential() {
        let roster = roster(&[1, 2]);
        let consensus = compute_consensus(&roster, &[ranking(&[1])]);
        let rows = compute_differential(&consensus, &ranking(&[2, 1]));
        assert_eq!(diffs(&rows), vec![None, Some(-1)]);
    }

    #[test]
    fn empty_consensus_gives_all_none() {
        let consensus = compute_consensus::<Vec<RankingItem>>(&roster(&[1, 2]), &[]);
        let rows = compute_differential(&consensus, &ranking(&[1, 2]));
        assert_eq!(diffs(&rows), vec![None, None]);
    }
}
