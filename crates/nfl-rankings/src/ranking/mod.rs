// Ranking vocabulary: positions, weeks, roster players, and ranking items.

pub mod item;
pub mod player;
pub mod position;
pub mod week;

pub use item::{
    default_ranking, encode_ranking_items, parse_ranking_items, player_ranks, ItemError,
    PlayerId, PlayerRef, RankingItem, TierMarker,
};
pub use player::Player;
pub use position::Position;
pub use week::Week;
