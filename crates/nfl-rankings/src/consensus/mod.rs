// Consensus engine: aggregate rank averaging, per-user differentials, the
// tier-placement view, and presentation rows.
//
// Everything here is pure: callers hand in a snapshot of the roster and the
// stored rankings, and every call allocates its own output.

pub mod aggregate;
pub mod differential;
pub mod table;
pub mod tiered;

pub use aggregate::{compute_consensus, ConsensusEntry, ConsensusResult};
pub use differential::{compute_differential, DifferentialRow};
pub use tiered::{compute_tiered_consensus, PlayerSummaryStats, TieredEntry};
