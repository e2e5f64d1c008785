// Roster players as uploaded by an admin.

use serde::{Deserialize, Serialize};

use super::item::PlayerId;
use super::position::Position;
use super::week::Week;

/// A roster player. Belongs to exactly one (position, week) bucket and is
/// never edited after upload, only deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: String,
    pub opponent: String,
    pub position: Position,
    pub week: Week,
    /// Upload order within the bucket; rosters are listed by
    /// `(sort_order, name)`.
    pub sort_order: i64,
}
