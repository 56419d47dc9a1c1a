//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use gamestats::{Match, MatchResult, ScoreboardEntry, Server, ServerInfo, StatsCaches, StatsService, Store};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

pub const EXAMPLE_ENDPOINT: &str = "167.42.23.32-1337";

pub const GAME_MODES: [&str; 4] = ["DM", "TDM", "CTF", "KOTH"];
pub const MAPS: [&str; 5] = ["DM-HelloWorld", "DM-Kitchen", "CTF-Face", "DM-Deck16", "DM-Morpheus"];

pub fn create_test_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("gamestats.db")).unwrap();
    store.init().unwrap();
    (dir, store)
}

pub fn create_test_service(ttl: std::time::Duration) -> (TempDir, StatsService) {
    let (dir, store) = create_test_store();
    (dir, StatsService::new(store, StatsCaches::with_ttl(ttl)))
}

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn example_timestamp() -> DateTime<Utc> {
    at(2017, 1, 22, 15, 11, 12)
}

pub fn example_server() -> Server {
    server(EXAMPLE_ENDPOINT, "] My P3rfect Server [")
}

pub fn server(endpoint: &str, name: &str) -> Server {
    Server::new(
        endpoint,
        ServerInfo {
            name: name.to_string(),
            game_modes: vec!["DM".to_string(), "TDM".to_string()],
        },
    )
}

pub fn entry(name: &str, frags: i32, kills: i32, deaths: i32) -> ScoreboardEntry {
    ScoreboardEntry {
        name: name.to_string(),
        frags,
        kills,
        deaths,
    }
}

/// The two-player DM-HelloWorld match used throughout the wire examples
pub fn example_match(server: &str, timestamp: DateTime<Utc>) -> Match {
    game(
        server,
        timestamp,
        "DM",
        "DM-HelloWorld",
        vec![entry("Player1", 20, 21, 3), entry("Player2", 2, 2, 21)],
    )
}

pub fn game(
    server: &str,
    timestamp: DateTime<Utc>,
    game_mode: &str,
    map: &str,
    scoreboard: Vec<ScoreboardEntry>,
) -> Match {
    Match {
        server: server.to_string(),
        timestamp,
        results: MatchResult {
            map: map.to_string(),
            game_mode: game_mode.to_string(),
            frag_limit: 20,
            time_limit: 20,
            time_elapsed: 12.345678,
            scoreboard,
        },
    }
}

/// Deterministic random matches spread over `servers`, one minute apart
pub fn random_matches(seed: u64, servers: &[String], count: usize) -> Vec<Match> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = at(2017, 1, 1, 0, 0, 0);
    let players: Vec<String> = (1..=12).map(|i| format!("Player{}", i)).collect();

    (0..count)
        .map(|i| {
            let server = servers.choose(&mut rng).unwrap();
            let population = rng.gen_range(1..=6);
            let scoreboard = players
                .choose_multiple(&mut rng, population)
                .map(|name| {
                    entry(
                        name,
                        rng.gen_range(0..30),
                        rng.gen_range(0..30),
                        rng.gen_range(0..30),
                    )
                })
                .collect();

            game(
                server,
                start + Duration::minutes(i as i64),
                GAME_MODES.choose(&mut rng).unwrap(),
                MAPS.choose(&mut rng).unwrap(),
                scoreboard,
            )
        })
        .collect()
}
