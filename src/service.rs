//! Service facade: store, aggregation engine and caches behind one API
//!
//! Cache instances are owned by the service and handed in at construction;
//! nothing here is global. Writes go straight to the store and never
//! invalidate caches, so reads may lag by up to one TTL.

use crate::aggregation;
use crate::cache::{ReportCache, StatCache};
use crate::domain::{
    player_search_name, BestPlayer, Match, MatchResult, PlayerStat, PopularServer, Server,
    ServerInfo, ServerStat,
};
use crate::error::Result;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Upper bound on the length of every report list
pub const MAX_REPORT_ITEMS: usize = 50;

/// The five caches in front of the store
pub struct StatsCaches {
    pub recent_matches: ReportCache<Match>,
    pub best_players: ReportCache<BestPlayer>,
    pub popular_servers: ReportCache<PopularServer>,
    pub server_stats: StatCache<ServerStat>,
    pub player_stats: StatCache<PlayerStat>,
}

impl StatsCaches {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            recent_matches: ReportCache::new(ttl),
            best_players: ReportCache::new(ttl),
            popular_servers: ReportCache::new(ttl),
            server_stats: StatCache::new(ttl),
            player_stats: StatCache::new(ttl),
        }
    }
}

pub struct StatsService {
    store: Store,
    caches: StatsCaches,
}

impl StatsService {
    pub fn new(store: Store, caches: StatsCaches) -> Self {
        Self { store, caches }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn caches(&self) -> &StatsCaches {
        &self.caches
    }

    pub fn upsert_server(&self, server: &Server) -> Result<()> {
        self.store.upsert_server(server)
    }

    /// `false` means the server was never advertised
    pub fn insert_match_if_new(&self, game_match: &Match) -> Result<bool> {
        self.store.insert_match_if_new(game_match)
    }

    pub fn get_server_info(&self, endpoint: &str) -> Result<Option<ServerInfo>> {
        self.store.get_server_info(endpoint)
    }

    pub fn list_all_servers(&self) -> Result<Vec<Server>> {
        self.store.list_all_servers()
    }

    pub fn get_match_result(
        &self,
        endpoint: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Option<MatchResult>> {
        self.store.get_match_result(endpoint, timestamp)
    }

    /// Aggregate for one server, zero-valued when it has no matches
    ///
    /// Zero values are not cached, so a server's first match shows up on
    /// the next call.
    pub fn get_server_stat(&self, endpoint: &str) -> Result<ServerStat> {
        if let Some(stat) = self.caches.server_stats.try_get(endpoint) {
            return Ok(stat);
        }

        log::debug!("Server stat cache miss for {}", endpoint);
        let rows = self.store.scan_matches_for_server_stat(endpoint)?;
        let watermark = self.store.get_last_match_timestamp()?;
        let stat = aggregation::server_stat(endpoint, &rows, watermark);

        if stat.total_matches_played > 0 {
            self.caches.server_stats.insert(stat.clone());
        }
        Ok(stat)
    }

    /// Aggregate for one player, name matched case-insensitively
    pub fn get_player_stat(&self, name: &str) -> Result<PlayerStat> {
        let key = player_search_name(name);
        if let Some(stat) = self.caches.player_stats.try_get(&key) {
            return Ok(stat);
        }

        log::debug!("Player stat cache miss for {}", key);
        let rows = self.store.scan_scoreboard_for_player(&key)?;
        let watermark = self.store.get_last_match_timestamp()?;
        let stat = aggregation::player_stat(&key, &rows, watermark);

        if stat.total_matches_played > 0 {
            self.caches.player_stats.insert(stat.clone());
        }
        Ok(stat)
    }

    /// Up to `min(count, 50)` latest matches, newest first
    pub fn get_recent_matches(&self, count: i64) -> Result<Vec<Match>> {
        let Some(max_count) = report_size(count) else {
            return Ok(Vec::new());
        };

        self.caches
            .recent_matches
            .get_or_refresh(max_count, || {
                log::debug!("Recomputing recent matches report");
                self.store.recent_matches(MAX_REPORT_ITEMS)
            })
    }

    pub fn get_best_players(&self, count: i64) -> Result<Vec<BestPlayer>> {
        let Some(max_count) = report_size(count) else {
            return Ok(Vec::new());
        };

        self.caches.best_players.get_or_refresh(max_count, || {
            log::debug!("Recomputing best players report");
            self.store.compute_best_players(MAX_REPORT_ITEMS)
        })
    }

    pub fn get_popular_servers(&self, count: i64) -> Result<Vec<PopularServer>> {
        let Some(max_count) = report_size(count) else {
            return Ok(Vec::new());
        };

        self.caches.popular_servers.get_or_refresh(max_count, || {
            log::debug!("Recomputing popular servers report");
            self.store.compute_popular_servers(MAX_REPORT_ITEMS)
        })
    }
}

/// Requested report length clamped to `MAX_REPORT_ITEMS`, `None` for `count <= 0`
fn report_size(count: i64) -> Option<usize> {
    if count <= 0 {
        return None;
    }
    Some(count.min(MAX_REPORT_ITEMS as i64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScoreboardEntry;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn create_test_service() -> (tempfile::TempDir, StatsService) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("service.db")).unwrap();
        store.init().unwrap();
        let service = StatsService::new(store, StatsCaches::with_ttl(Duration::from_secs(60)));
        (dir, service)
    }

    fn advertise(service: &StatsService, endpoint: &str) {
        service
            .upsert_server(&Server::new(
                endpoint,
                ServerInfo {
                    name: endpoint.to_string(),
                    game_modes: vec!["DM".to_string()],
                },
            ))
            .unwrap();
    }

    fn report(service: &StatsService, endpoint: &str, timestamp: DateTime<Utc>) {
        let game_match = Match {
            server: endpoint.to_string(),
            timestamp,
            results: MatchResult {
                map: "DM-HelloWorld".to_string(),
                game_mode: "DM".to_string(),
                frag_limit: 20,
                time_limit: 20,
                time_elapsed: 12.345678,
                scoreboard: vec![ScoreboardEntry {
                    name: "Player1".to_string(),
                    frags: 20,
                    kills: 21,
                    deaths: 3,
                }],
            },
        };
        assert!(service.insert_match_if_new(&game_match).unwrap());
    }

    #[test]
    fn test_report_size() {
        assert_eq!(report_size(-3), None);
        assert_eq!(report_size(0), None);
        assert_eq!(report_size(5), Some(5));
        assert_eq!(report_size(500), Some(MAX_REPORT_ITEMS));
    }

    #[test]
    fn test_non_positive_counts_return_empty_without_touching_caches() {
        let (_dir, service) = create_test_service();
        advertise(&service, "a-1");
        report(&service, "a-1", Utc.with_ymd_and_hms(2017, 1, 22, 15, 11, 12).unwrap());

        assert!(service.get_recent_matches(0).unwrap().is_empty());
        assert!(service.get_best_players(-1).unwrap().is_empty());
        assert!(service.get_popular_servers(0).unwrap().is_empty());
        assert!(service.caches().recent_matches.try_get(50).is_none());
    }

    #[test]
    fn test_server_stat_served_from_cache_within_ttl() {
        let (_dir, service) = create_test_service();
        advertise(&service, "a-1");
        report(&service, "a-1", Utc.with_ymd_and_hms(2017, 1, 22, 15, 11, 12).unwrap());

        let first = service.get_server_stat("a-1").unwrap();
        report(&service, "a-1", Utc.with_ymd_and_hms(2017, 1, 22, 16, 0, 0).unwrap());
        let second = service.get_server_stat("a-1").unwrap();

        assert_eq!(first.total_matches_played, 1);
        assert_eq!(second, first);
    }

    #[test]
    fn test_zero_value_stats_are_not_cached() {
        let (_dir, service) = create_test_service();
        advertise(&service, "a-1");

        assert_eq!(service.get_server_stat("a-1").unwrap().total_matches_played, 0);
        assert!(service.caches().server_stats.is_empty());

        report(&service, "a-1", Utc.with_ymd_and_hms(2017, 1, 22, 15, 11, 12).unwrap());
        assert_eq!(service.get_server_stat("a-1").unwrap().total_matches_played, 1);
        assert_eq!(service.get_player_stat("player1").unwrap().total_matches_played, 1);
        assert_eq!(service.caches().player_stats.len(), 1);
    }

    #[test]
    fn test_report_cache_serves_prefix_of_published_list() {
        let (_dir, service) = create_test_service();
        advertise(&service, "a-1");
        for hour in 0..4 {
            report(&service, "a-1", Utc.with_ymd_and_hms(2017, 1, 22, hour, 0, 0).unwrap());
        }

        let two = service.get_recent_matches(2).unwrap();
        let all = service.get_recent_matches(10).unwrap();

        assert_eq!(two.len(), 2);
        assert_eq!(all.len(), 4);
        assert_eq!(two[..], all[..2]);
        assert_eq!(
            all[0].timestamp,
            Utc.with_ymd_and_hms(2017, 1, 22, 3, 0, 0).unwrap()
        );
    }
}
