// Presentation rows and plain-text tables for consensus output.

use serde::Serialize;

use super::aggregate::ConsensusResult;
use super::differential::DifferentialRow;
use super::tiered::TieredEntry;

/// Placeholder shown where a value does not exist.
pub const MISSING: &str = "—";

/// A consensus table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusRow {
    pub rank: u32,
    pub name: String,
    pub team: String,
    pub opponent: String,
    pub average_rank: f64,
    pub min_rank: u32,
    pub max_rank: u32,
}

/// A row of one user's ranking as shown next to the consensus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UserViewRow {
    Tier {
        name: String,
    },
    Player {
        rank: u32,
        name: String,
        team: String,
        opponent: String,
        differential: Option<i64>,
    },
}

pub fn consensus_rows(result: &ConsensusResult) -> Vec<ConsensusRow> {
    result
        .entries
        .iter()
        .map(|e| ConsensusRow {
            rank: e.consensus_rank,
            name: e.player.name.clone(),
            team: e.player.team.clone(),
            opponent: e.player.opponent.clone(),
            average_rank: e.average_rank,
            min_rank: e.min_rank,
            max_rank: e.max_rank,
        })
        .collect()
}

pub fn user_view_rows(rows: &[DifferentialRow]) -> Vec<UserViewRow> {
    rows.iter()
        .map(|row| match row {
            DifferentialRow::Tier(t) => UserViewRow::Tier {
                name: t.name.clone(),
            },
            DifferentialRow::Player {
                player,
                user_rank,
                differential,
                ..
            } => UserViewRow::Player {
                rank: *user_rank,
                name: player.name.clone(),
                team: player.team.clone(),
                opponent: player.opponent.clone(),
                differential: *differential,
            },
        })
        .collect()
}

/// Average rank to one decimal place.
pub fn format_average(value: f64) -> String {
    format!("{value:.1}")
}

/// Signed differential: `+2`, `-2`, `0`, or the missing marker.
pub fn format_differential(diff: Option<i64>) -> String {
    match diff {
        Some(d) if d > 0 => format!("+{d}"),
        Some(d) => d.to_string(),
        None => MISSING.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

pub fn render_consensus(title: &str, rows: &[ConsensusRow]) -> String {
    let mut out = format!("{title}\n");
    out.push_str(&format!(
        "{:>4}  {:<26} {:<5} {:<5} {:>5} {:>4} {:>4}\n",
        "Rank", "Player", "Team", "Opp", "Avg", "High", "Low"
    ));
    for r in rows {
        out.push_str(&format!(
            "{:>4}  {:<26} {:<5} {:<5} {:>5} {:>4} {:>4}\n",
            r.rank,
            r.name,
            r.team,
            r.opponent,
            format_average(r.average_rank),
            r.min_rank,
            r.max_rank
        ));
    }
    out
}

pub fn render_user_view(title: &str, rows: &[UserViewRow]) -> String {
    let mut out = format!("{title}\n");
    out.push_str(&format!(
        "{:>4}  {:<26} {:<5} {:<5} {:>5}\n",
        "Rank", "Player", "Team", "Opp", "Diff"
    ));
    for row in rows {
        match row {
            UserViewRow::Tier { name } => out.push_str(&format!("  -- {name} --\n")),
            UserViewRow::Player {
                rank,
                name,
                team,
                opponent,
                differential,
            } => out.push_str(&format!(
                "{:>4}  {:<26} {:<5} {:<5} {:>5}\n",
                rank,
                name,
                team,
                opponent,
                format_differential(*differential)
            )),
        }
    }
    out
}

pub fn render_tiered(title: &str, entries: &[TieredEntry]) -> String {
    let mut out = format!("{title}\n");
    out.push_str(&format!(
        "{:>4}  {:<26} {:<5} {:<5} {:>5} {:>4} {:>4}\n",
        "Rank", "Player", "Team", "Opp", "Avg", "High", "Low"
    ));
    for entry in entries {
        match entry {
            TieredEntry::Tier { name, .. } => out.push_str(&format!("  -- {name} --\n")),
            TieredEntry::Player {
                player,
                display_rank,
                stats,
                ..
            } => out.push_str(&format!(
                "{:>4}  {:<26} {:<5} {:<5} {:>5} {:>4} {:>4}\n",
                display_rank,
                player.name,
                player.team,
                player.opponent,
                format_average(stats.average_rank),
                stats.min_rank,
                stats.max_rank
            )),
        }
    }
    out
}
