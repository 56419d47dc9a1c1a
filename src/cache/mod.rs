//! In-memory caches in front of the stat store
//!
//! Two disciplines with different locking contracts:
//!
//! - `ReportCache` - one ordered list per report kind. Its guard is held
//!   across check, recompute and publish, so concurrent misses collapse
//!   into a single recomputation.
//! - `StatCache` - per-key aggregates with lazy time-based eviction. The
//!   guard covers only the map itself; concurrent misses for one key may
//!   both recompute and both insert the same value.

pub mod report_cache;
pub mod stat_cache;

pub use report_cache::ReportCache;
pub use stat_cache::{Keyed, StatCache};
