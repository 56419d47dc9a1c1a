//! Game Stats CLI - command-line front end over the stat store
//!
//! ## Usage
//!
//! ```bash
//! gamestats init
//! gamestats advertise 167.42.23.32-1337 info.json
//! gamestats report match.json
//! gamestats server-stats 167.42.23.32-1337
//! gamestats best-players 10
//! ```
//!
//! Results are printed as JSON on stdout, logs go to stderr.
//!
//! ## Environment Variables
//!
//! - GAMESTATS_DB_PATH - SQLite database path (default: data/gamestats.db)
//! - GAMESTATS_CACHE_TTL_SECS - Cache TTL in seconds (default: 59)
//! - RUST_LOG - Logging level (optional, default: info)

use chrono::{DateTime, Utc};
use gamestats::{Match, Server, ServerInfo, StatsCaches, StatsConfig, StatsService, Store};
use serde::Serialize;
use std::env;
use std::fs;

const DEFAULT_REPORT_COUNT: i64 = 5;

const USAGE: &str = "usage: gamestats <command> [args]

commands:
  init                               create tables and indexes
  advertise <endpoint> <info.json>   insert or replace a server
  report <match.json>                record a finished match
  servers                            list all servers
  server-info <endpoint>             show one server's info
  match <endpoint> <timestamp>       show one match result
  server-stats <endpoint>            aggregate statistics for a server
  player-stats <name>                aggregate statistics for a player
  recent-matches [count]             latest matches (default 5)
  best-players [count]               best kill/death ratios (default 5)
  popular-servers [count]            most matches per day (default 5)";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = StatsConfig::from_env();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    config.validate()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    log::debug!("Database: {}", config.db_path);
    let store = Store::open(&config.db_path)?;
    let service = StatsService::new(store, StatsCaches::with_ttl(config.cache_ttl()));

    match command {
        "init" => {
            service.store().init()?;
        }
        "advertise" => {
            let endpoint = required_arg(&args, 1, "endpoint")?;
            let info: ServerInfo = serde_json::from_str(&fs::read_to_string(
                required_arg(&args, 2, "info.json")?,
            )?)?;
            service.upsert_server(&Server::new(endpoint, info))?;
            log::info!("✅ Advertised {}", endpoint);
        }
        "report" => {
            let game_match: Match =
                serde_json::from_str(&fs::read_to_string(required_arg(&args, 1, "match.json")?)?)?;
            let accepted = service.insert_match_if_new(&game_match)?;
            if !accepted {
                log::warn!("⚠️  Server {} is not advertised", game_match.server);
            }
            print_json(&accepted)?;
        }
        "servers" => print_json(&service.list_all_servers()?)?,
        "server-info" => {
            print_json(&service.get_server_info(required_arg(&args, 1, "endpoint")?)?)?
        }
        "match" => {
            let endpoint = required_arg(&args, 1, "endpoint")?;
            let timestamp = parse_timestamp(required_arg(&args, 2, "timestamp")?)?;
            print_json(&service.get_match_result(endpoint, &timestamp)?)?;
        }
        "server-stats" => {
            print_json(&service.get_server_stat(required_arg(&args, 1, "endpoint")?)?)?
        }
        "player-stats" => print_json(&service.get_player_stat(required_arg(&args, 1, "name")?)?)?,
        "recent-matches" => print_json(&service.get_recent_matches(report_count(&args)?)?)?,
        "best-players" => print_json(&service.get_best_players(report_count(&args)?)?)?,
        "popular-servers" => print_json(&service.get_popular_servers(report_count(&args)?)?)?,
        other => {
            eprintln!("unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn required_arg<'a>(
    args: &'a [String],
    index: usize,
    name: &str,
) -> Result<&'a str, Box<dyn std::error::Error>> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument <{}>\n\n{}", name, USAGE).into())
}

fn report_count(args: &[String]) -> Result<i64, Box<dyn std::error::Error>> {
    match args.get(1) {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(DEFAULT_REPORT_COUNT),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
