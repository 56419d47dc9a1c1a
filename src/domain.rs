//! Domain types: persisted entities, scan rows and computed aggregates
//!
//! Field names follow the camelCase wire contract. Decimal fields are
//! rounded to six digits on serialization only (see `format`).

use crate::cache::Keyed;
use crate::format::serialize_decimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub game_modes: Vec<String>,
}

/// Game server advertised under a unique endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub endpoint: String,
    pub info: ServerInfo,
}

impl Server {
    pub fn new(endpoint: impl Into<String>, info: ServerInfo) -> Self {
        Self {
            endpoint: endpoint.into(),
            info,
        }
    }
}

/// One line of a match scoreboard
///
/// The entry's place is its 1-based position in `MatchResult::scoreboard`;
/// it is never derived from frags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    pub name: String,
    pub frags: i32,
    pub kills: i32,
    pub deaths: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub map: String,
    pub game_mode: String,
    pub frag_limit: i32,
    pub time_limit: i32,
    #[serde(serialize_with = "serialize_decimal")]
    pub time_elapsed: f64,
    #[serde(default)]
    pub scoreboard: Vec<ScoreboardEntry>,
}

impl MatchResult {
    /// Number of players in the match
    pub fn population(&self) -> usize {
        self.scoreboard.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub server: String,
    pub timestamp: DateTime<Utc>,
    pub results: MatchResult,
}

/// Per-match row scanned for a server's statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMatchRow {
    pub timestamp: DateTime<Utc>,
    pub population: i64,
    pub game_mode: String,
    pub map: String,
}

/// Per-match row scanned for a player's statistics
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatchRow {
    pub kills: i64,
    pub deaths: i64,
    pub place: i64,
    pub server: String,
    pub timestamp: DateTime<Utc>,
    pub game_mode: String,
    pub population: i64,
}

/// Aggregate statistics for one server
///
/// `Default` is the canonical "no data" value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStat {
    #[serde(skip)]
    pub endpoint: String,
    pub total_matches_played: i64,
    pub maximum_matches_per_day: i64,
    #[serde(serialize_with = "serialize_decimal")]
    pub average_matches_per_day: f64,
    pub maximum_population: i64,
    #[serde(serialize_with = "serialize_decimal")]
    pub average_population: f64,
    pub top5_game_modes: Vec<String>,
    pub top5_maps: Vec<String>,
}

/// Aggregate statistics for one player
///
/// `name` holds the case-folded lookup key. `Default` is the canonical
/// "no data" value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    #[serde(skip)]
    pub name: String,
    pub total_matches_played: i64,
    pub total_matches_won: i64,
    pub favorite_server: Option<String>,
    pub unique_servers: i64,
    pub favorite_game_mode: Option<String>,
    #[serde(serialize_with = "serialize_decimal")]
    pub average_scoreboard_percent: f64,
    pub maximum_matches_per_day: i64,
    #[serde(serialize_with = "serialize_decimal")]
    pub average_matches_per_day: f64,
    pub last_match_played: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_decimal")]
    pub kill_to_death_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPlayer {
    pub name: String,
    #[serde(serialize_with = "serialize_decimal")]
    pub kill_to_death_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularServer {
    pub endpoint: String,
    pub name: String,
    #[serde(serialize_with = "serialize_decimal")]
    pub average_matches_per_day: f64,
}

impl Keyed for ServerStat {
    fn cache_key(&self) -> &str {
        &self.endpoint
    }
}

impl Keyed for PlayerStat {
    fn cache_key(&self) -> &str {
        &self.name
    }
}

/// Case-folded form of a player name used for lookups
pub fn player_search_name(name: &str) -> String {
    name.to_lowercase()
}
