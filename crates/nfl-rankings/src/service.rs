// Request boundary: validates raw position/week strings and ranking bodies,
// then drives storage and the consensus aggregator.

use std::io::Read;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, UploadLimits};
use crate::consensus::table::{consensus_rows, user_view_rows, ConsensusRow, UserViewRow};
use crate::consensus::{compute_consensus, compute_differential, compute_tiered_consensus, TieredEntry};
use crate::db::Database;
use crate::import::{parse_roster_csv, ImportError, UploadMode};
use crate::ranking::{
    default_ranking, parse_ranking_items, Player, Position, RankingItem, Week,
};
use crate::schedule::resolve_current_week;

/// Settings key under which admin-edited upload limits are stored.
const UPLOAD_LIMITS_KEY: &str = "upload_limits";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid position '{0}': expected one of QB, RB, WR, TE")]
    InvalidPosition(String),

    #[error("invalid week '{0}'")]
    InvalidWeek(String),

    #[error("invalid ranking data: {0}")]
    InvalidRankingData(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A validated (position, week) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub position: Position,
    pub week: Week,
}

impl Bucket {
    pub fn title(&self) -> String {
        format!("{} {}", self.position, self.week.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranker {
    pub user_id: i64,
    pub display_name: String,
}

/// Consensus table for one bucket plus who contributed to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusView {
    pub bucket: Bucket,
    pub rows: Vec<ConsensusRow>,
    pub submissions: usize,
    pub rankers: Vec<Ranker>,
}

/// One user's saved ranking shown against the bucket's consensus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub bucket: Bucket,
    pub user_id: i64,
    pub rows: Vec<UserViewRow>,
}

pub struct RankingService<'a> {
    db: &'a Database,
    config: &'a Config,
}

impl<'a> RankingService<'a> {
    pub fn new(db: &'a Database, config: &'a Config) -> Self {
        RankingService { db, config }
    }

    /// One-time setup: seeds the default schedule when configured to and
    /// none exists yet.
    pub fn init(&self) -> Result<(), ServiceError> {
        if self.config.schedule.seed_default
            && self.db.seed_default_schedule_if_empty(now())?
        {
            info!("seeded default week schedule");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// The week in effect right now according to the schedule.
    pub fn current_week(&self) -> Result<Week, ServiceError> {
        self.current_week_at(now())
    }

    pub fn current_week_at(&self, at: NaiveDateTime) -> Result<Week, ServiceError> {
        let schedule = self.db.load_schedule()?;
        Ok(resolve_current_week(&schedule, at))
    }

    /// Validate a raw position and optional raw week. Position is checked
    /// first; a missing or blank week resolves to the current week.
    pub fn bucket(&self, position: &str, week: Option<&str>) -> Result<Bucket, ServiceError> {
        let position = Position::from_str_pos(position)
            .ok_or_else(|| ServiceError::InvalidPosition(position.to_string()))?;
        let week = match week.map(str::trim).filter(|w| !w.is_empty()) {
            Some(raw) => Week::parse(raw).ok_or_else(|| ServiceError::InvalidWeek(raw.to_string()))?,
            None => self.current_week()?,
        };
        Ok(Bucket { position, week })
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    pub fn players(&self, position: &str, week: Option<&str>) -> Result<Vec<Player>, ServiceError> {
        let bucket = self.bucket(position, week)?;
        Ok(self.db.get_roster(bucket.position, bucket.week)?)
    }

    /// Parse and store an uploaded roster CSV, capped by the position's
    /// upload limit. Returns the number of players stored.
    pub fn import_roster<R: Read>(
        &self,
        position: &str,
        week: Option<&str>,
        rdr: R,
        mode: UploadMode,
    ) -> Result<usize, ServiceError> {
        let bucket = self.bucket(position, week)?;
        let limit = self.upload_limits()?.limit_for(bucket.position);
        let rows = parse_roster_csv(rdr, limit)?;
        let stored = self
            .db
            .import_roster(bucket.position, bucket.week, &rows, mode)?;
        info!("imported {stored} players into {} ({mode:?})", bucket.title());
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Rankings
    // ------------------------------------------------------------------

    /// Decode and store a user's ranking. The body must contain at least
    /// one well-formed item; player ids outside the roster are accepted.
    pub fn save_ranking(
        &self,
        user_id: i64,
        position: &str,
        week: Option<&str>,
        body: &str,
    ) -> Result<Bucket, ServiceError> {
        let bucket = self.bucket(position, week)?;
        let items =
            parse_ranking_items(body).map_err(|e| ServiceError::InvalidRankingData(e.to_string()))?;
        if items.is_empty() {
            return Err(ServiceError::InvalidRankingData(
                "ranking contains no valid items".into(),
            ));
        }
        self.db
            .upsert_user_ranking(user_id, bucket.position, bucket.week, &items)?;
        debug!("saved {} items for user {user_id} in {}", items.len(), bucket.title());
        Ok(bucket)
    }

    /// Returns `true` if a ranking existed and was removed.
    pub fn delete_ranking(
        &self,
        user_id: i64,
        position: &str,
        week: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let bucket = self.bucket(position, week)?;
        Ok(self
            .db
            .delete_user_ranking(user_id, bucket.position, bucket.week)?)
    }

    /// The user's saved ranking. With nothing saved, the starter tier
    /// template over the roster, or the bare roster when the template is
    /// disabled.
    pub fn user_ranking(
        &self,
        user_id: i64,
        position: &str,
        week: Option<&str>,
    ) -> Result<Vec<RankingItem>, ServiceError> {
        let bucket = self.bucket(position, week)?;
        if let Some(items) = self
            .db
            .get_user_ranking(user_id, bucket.position, bucket.week)?
        {
            return Ok(items);
        }

        let roster = self.db.get_roster(bucket.position, bucket.week)?;
        if self.config.rankings.template_for_new_users {
            Ok(default_ranking(&roster))
        } else {
            Ok(roster
                .iter()
                .map(|p| RankingItem::Player(p.into()))
                .collect())
        }
    }

    // ------------------------------------------------------------------
    // Consensus
    // ------------------------------------------------------------------

    pub fn consensus(&self, position: &str, week: Option<&str>) -> Result<ConsensusView, ServiceError> {
        let bucket = self.bucket(position, week)?;
        let roster = self.db.get_roster(bucket.position, bucket.week)?;
        let rankings = self.db.get_all_rankings(bucket.position, bucket.week)?;
        let result = compute_consensus(&roster, &rankings);

        Ok(ConsensusView {
            bucket,
            rows: consensus_rows(&result),
            submissions: result.submissions,
            rankers: rankings
                .into_iter()
                .map(|r| Ranker {
                    user_id: r.user_id,
                    display_name: r.user_display_name,
                })
                .collect(),
        })
    }

    pub fn tiered_consensus(
        &self,
        position: &str,
        week: Option<&str>,
    ) -> Result<(Bucket, Vec<TieredEntry>), ServiceError> {
        let bucket = self.bucket(position, week)?;
        let roster = self.db.get_roster(bucket.position, bucket.week)?;
        let rankings = self.db.get_all_rankings(bucket.position, bucket.week)?;
        Ok((bucket, compute_tiered_consensus(&roster, &rankings)))
    }

    /// A user's saved ranking with each player's differential against the
    /// bucket consensus. `None` when the user has nothing saved.
    pub fn user_view(
        &self,
        user_id: i64,
        position: &str,
        week: Option<&str>,
    ) -> Result<Option<UserView>, ServiceError> {
        let bucket = self.bucket(position, week)?;
        let Some(items) = self
            .db
            .get_user_ranking(user_id, bucket.position, bucket.week)?
        else {
            return Ok(None);
        };

        let roster = self.db.get_roster(bucket.position, bucket.week)?;
        let rankings = self.db.get_all_rankings(bucket.position, bucket.week)?;
        let consensus = compute_consensus(&roster, &rankings);
        let rows = user_view_rows(&compute_differential(&consensus, &items));

        Ok(Some(UserView {
            bucket,
            user_id,
            rows,
        }))
    }

    // ------------------------------------------------------------------
    // Upload limits
    // ------------------------------------------------------------------

    /// Effective per-position upload limits: stored settings when present,
    /// otherwise the configured defaults.
    pub fn upload_limits(&self) -> Result<UploadLimits, ServiceError> {
        let Some(value) = self.db.load_setting(UPLOAD_LIMITS_KEY)? else {
            return Ok(self.config.upload_limits);
        };
        match serde_json::from_value::<UploadLimits>(value) {
            Ok(limits) => Ok(limits),
            Err(e) => {
                warn!("ignoring unreadable stored upload limits: {e}");
                Ok(self.config.upload_limits)
            }
        }
    }

    pub fn set_upload_limits(&self, limits: UploadLimits) -> Result<(), ServiceError> {
        limits.validate()?;
        let value = serde_json::to_value(limits)
            .map_err(|e| anyhow::Error::new(e).context("failed to serialize upload limits"))?;
        self.db.save_setting(UPLOAD_LIMITS_KEY, &value)?;
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
