//! Game-server match statistics
//!
//! Servers advertise themselves, report finished matches, and the crate
//! answers per-server and per-player statistics plus three global reports
//! (recent matches, best players, popular servers) from a SQLite store
//! fronted by TTL caches.

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod service;
pub mod sqlite_pragma;
pub mod store;

pub use config::StatsConfig;
pub use domain::{
    BestPlayer, Match, MatchResult, PlayerStat, PopularServer, ScoreboardEntry, Server,
    ServerInfo, ServerStat,
};
pub use error::{Result, StatsError};
pub use service::{StatsCaches, StatsService, MAX_REPORT_ITEMS};
pub use store::Store;
