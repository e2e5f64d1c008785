// SQLite persistence layer for rosters, rankings, users, and the schedule.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

use crate::import::{RosterRow, UploadMode};
use crate::ranking::{
    encode_ranking_items, parse_ranking_items, Player, PlayerId, Position, RankingItem, Week,
};
use crate::schedule::{default_schedule, validate_entry, ScheduleEntry, DATETIME_FORMAT};

/// A stored ranking together with its owner, as listed for a bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRanking {
    pub ranking_id: i64,
    pub user_id: i64,
    pub user_display_name: String,
    /// Decoded items. Empty when the stored body could not be decoded.
    pub items: Vec<RankingItem>,
    pub updated_at: String,
}

impl AsRef<[RankingItem]> for StoredRanking {
    fn as_ref(&self) -> &[RankingItem] {
        &self.items
    }
}

/// SQLite-backed storage. One instance per process; the connection is
/// guarded by a mutex so the handle can be shared across request handlers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS players (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                team       TEXT NOT NULL,
                opponent   TEXT NOT NULL,
                position   TEXT NOT NULL,
                week       TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_players_position_week
                ON players(position, week);

            CREATE TABLE IF NOT EXISTS users (
                id           INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rankings (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      INTEGER NOT NULL,
                position     TEXT NOT NULL,
                week         TEXT NOT NULL,
                ranking_data TEXT NOT NULL,
                updated_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now')),
                UNIQUE(user_id, position, week)
            );

            CREATE INDEX IF NOT EXISTS idx_rankings_position_week
                ON rankings(position, week);

            CREATE TABLE IF NOT EXISTS schedules (
                week       TEXT PRIMARY KEY,
                start_date TEXT NOT NULL,
                end_date   TEXT NOT NULL,
                is_active  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS settings (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Players of one bucket in upload order.
    pub fn get_roster(&self, position: Position, week: Week) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, team, opponent, sort_order
                 FROM players WHERE position = ?1 AND week = ?2
                 ORDER BY sort_order ASC, name ASC",
            )
            .context("failed to prepare get_roster query")?;

        let players = stmt
            .query_map(params![position.display_str(), week.key()], |row| {
                Ok(Player {
                    id: PlayerId(row.get(0)?),
                    name: row.get(1)?,
                    team: row.get(2)?,
                    opponent: row.get(3)?,
                    position,
                    week,
                    sort_order: row.get(4)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        Ok(players)
    }

    /// Store uploaded roster rows for a bucket in a single transaction.
    /// Returns the number of players inserted.
    pub fn import_roster(
        &self,
        position: Position,
        week: Week,
        rows: &[RosterRow],
        mode: UploadMode,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;
        let pos = position.display_str();
        let week_key = week.key();

        if mode == UploadMode::Override {
            let removed = tx
                .execute(
                    "DELETE FROM players WHERE position = ?1 AND week = ?2",
                    params![pos, week_key],
                )
                .context("failed to clear roster for override")?;
            debug!("override upload removed {removed} {pos} players for {week_key}");
        }

        let max_sort: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(sort_order), 0) FROM players WHERE position = ?1 AND week = ?2",
                params![pos, week_key],
                |row| row.get(0),
            )
            .context("failed to read max sort_order")?;

        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO players (name, team, opponent, position, week, sort_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .context("failed to prepare player insert")?;
            for (row, sort_order) in rows.iter().zip(max_sort + 1..) {
                insert
                    .execute(params![row.name, row.team, row.opponent, pos, week_key, sort_order])
                    .context("failed to insert player")?;
            }
        }

        tx.commit().context("failed to commit roster import")?;
        Ok(rows.len())
    }

    /// Delete players by id. Returns how many rows were removed.
    pub fn delete_players(&self, ids: &[PlayerId]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM players WHERE id = ?1")
                .context("failed to prepare player delete")?;
            for id in ids {
                removed += stmt.execute(params![id.0]).context("failed to delete player")?;
            }
        }
        tx.commit().context("failed to commit delete_players")?;
        Ok(removed)
    }

    /// Delete a bucket's whole roster.
    pub fn clear_roster(&self, position: Position, week: Week) -> Result<usize> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM players WHERE position = ?1 AND week = ?2",
                params![position.display_str(), week.key()],
            )
            .context("failed to clear roster")?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Create a user or rename an existing one.
    pub fn upsert_user(&self, user_id: i64, display_name: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, display_name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
            params![user_id, display_name],
        )
        .context("failed to upsert user")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rankings
    // ------------------------------------------------------------------

    /// Every ranking stored for a bucket, in submission order. A body that
    /// cannot be decoded is logged and returned with no items, so it
    /// contributes nothing to a consensus.
    pub fn get_all_rankings(&self, position: Position, week: Week) -> Result<Vec<StoredRanking>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT r.id, r.user_id, COALESCE(u.display_name, 'User ' || r.user_id),
                        r.ranking_data, r.updated_at
                 FROM rankings r LEFT JOIN users u ON u.id = r.user_id
                 WHERE r.position = ?1 AND r.week = ?2
                 ORDER BY r.id",
            )
            .context("failed to prepare get_all_rankings query")?;

        let rows = stmt
            .query_map(params![position.display_str(), week.key()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query rankings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map ranking rows")?;

        Ok(rows
            .into_iter()
            .map(|(ranking_id, user_id, user_display_name, body, updated_at)| {
                let items = parse_ranking_items(&body).unwrap_or_else(|e| {
                    warn!("ignoring undecodable ranking {ranking_id} of user {user_id}: {e}");
                    Vec::new()
                });
                StoredRanking {
                    ranking_id,
                    user_id,
                    user_display_name,
                    items,
                    updated_at,
                }
            })
            .collect())
    }

    /// A user's ranking for a bucket. `None` when nothing is stored, or when
    /// the stored body cannot be decoded.
    pub fn get_user_ranking(
        &self,
        user_id: i64,
        position: Position,
        week: Week,
    ) -> Result<Option<Vec<RankingItem>>> {
        let conn = self.conn();
        let body: Option<String> = conn
            .query_row(
                "SELECT ranking_data FROM rankings
                 WHERE user_id = ?1 AND position = ?2 AND week = ?3",
                params![user_id, position.display_str(), week.key()],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query user ranking")?;

        Ok(body.and_then(|json| match parse_ranking_items(&json) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("stored ranking of user {user_id} for {position} {week} is unreadable: {e}");
                None
            }
        }))
    }

    /// Insert or replace a user's ranking for a bucket. At most one row
    /// exists per (user, position, week).
    pub fn upsert_user_ranking(
        &self,
        user_id: i64,
        position: Position,
        week: Week,
        items: &[RankingItem],
    ) -> Result<()> {
        let body = encode_ranking_items(items).context("failed to encode ranking")?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO rankings (user_id, position, week, ranking_data)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, position, week) DO UPDATE SET
                ranking_data = excluded.ranking_data,
                updated_at   = strftime('%Y-%m-%d %H:%M:%S', 'now')",
            params![user_id, position.display_str(), week.key(), body],
        )
        .context("failed to upsert ranking")?;
        Ok(())
    }

    /// Delete a user's ranking for a bucket. Returns `true` if a row was
    /// removed.
    pub fn delete_user_ranking(&self, user_id: i64, position: Position, week: Week) -> Result<bool> {
        let conn = self.conn();
        let removed = conn
            .execute(
                "DELETE FROM rankings WHERE user_id = ?1 AND position = ?2 AND week = ?3",
                params![user_id, position.display_str(), week.key()],
            )
            .context("failed to delete ranking")?;
        Ok(removed > 0)
    }

    /// Admin bulk delete by ranking id.
    pub fn delete_rankings(&self, ranking_ids: &[i64]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM rankings WHERE id = ?1")
                .context("failed to prepare ranking delete")?;
            for id in ranking_ids {
                removed += stmt.execute(params![id]).context("failed to delete ranking")?;
            }
        }
        tx.commit().context("failed to commit delete_rankings")?;
        Ok(removed)
    }

    /// Store a raw ranking body as-is, bypassing encoding. Used when
    /// restoring exported data verbatim.
    pub fn store_raw_ranking(
        &self,
        user_id: i64,
        position: Position,
        week: Week,
        body: &str,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO rankings (user_id, position, week, ranking_data)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, position, week) DO UPDATE SET
                ranking_data = excluded.ranking_data,
                updated_at   = strftime('%Y-%m-%d %H:%M:%S', 'now')",
            params![user_id, position.display_str(), week.key(), body],
        )
        .context("failed to store raw ranking")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Schedule
    // ------------------------------------------------------------------

    /// All schedule entries in catalog order. Rows with an unknown week or
    /// unreadable timestamps are skipped.
    pub fn load_schedule(&self) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT week, start_date, end_date, is_active FROM schedules")
            .context("failed to prepare load_schedule query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })
            .context("failed to query schedule")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map schedule rows")?;

        let mut entries: Vec<ScheduleEntry> = rows
            .into_iter()
            .filter_map(|(week_key, start, end, is_active)| {
                let Some(week) = Week::parse(&week_key) else {
                    warn!("skipping schedule row with unknown week '{week_key}'");
                    return None;
                };
                let start = NaiveDateTime::parse_from_str(&start, DATETIME_FORMAT).ok();
                let end = NaiveDateTime::parse_from_str(&end, DATETIME_FORMAT).ok();
                match (start, end) {
                    (Some(start), Some(end)) => Some(ScheduleEntry {
                        week,
                        start,
                        end,
                        is_active,
                    }),
                    _ => {
                        warn!("skipping schedule row for {week} with unreadable dates");
                        None
                    }
                }
            })
            .collect();
        entries.sort_by_key(|e| e.week);
        Ok(entries)
    }

    /// Insert or overwrite schedule entries, validating each window first.
    pub fn replace_schedule(&self, entries: &[ScheduleEntry]) -> Result<()> {
        for entry in entries {
            validate_entry(entry)?;
        }

        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO schedules (week, start_date, end_date, is_active)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .context("failed to prepare schedule upsert")?;
            for entry in entries {
                stmt.execute(params![
                    entry.week.key(),
                    entry.start.format(DATETIME_FORMAT).to_string(),
                    entry.end.format(DATETIME_FORMAT).to_string(),
                    entry.is_active,
                ])
                .context("failed to store schedule entry")?;
            }
        }
        tx.commit().context("failed to commit schedule")?;
        Ok(())
    }

    /// Seed the default schedule starting at `now` if no schedule exists.
    /// Returns `true` if entries were written.
    pub fn seed_default_schedule_if_empty(&self, now: NaiveDateTime) -> Result<bool> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM schedules", [], |row| row.get(0))
            .context("failed to count schedule rows")?;
        if count > 0 {
            return Ok(false);
        }
        self.replace_schedule(&default_schedule(now))?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Settings (key-value)
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`, overwriting any previous
    /// value.
    pub fn save_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize setting")?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save setting")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query setting")?;

        json_str
            .map(|s| serde_json::from_str(&s).context("failed to deserialize setting"))
            .transpose()
    }
}
