//! Aggregation engine: turns scanned rows into server and player statistics
//!
//! Pure functions over already-fetched rows. Day buckets are UTC calendar
//! dates. Day spans run from the first row's date to the watermark's date,
//! inclusive, so a server that played once on the watermark day has a span
//! of one.

use crate::domain::{PlayerMatchRow, PlayerStat, ServerMatchRow, ServerStat};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};

/// Length of the top game modes / top maps lists
pub const TOP_LIST_LEN: usize = 5;

pub fn server_stat(
    endpoint: &str,
    rows: &[ServerMatchRow],
    watermark: Option<DateTime<Utc>>,
) -> ServerStat {
    if rows.is_empty() {
        return ServerStat {
            endpoint: endpoint.to_string(),
            ..Default::default()
        };
    }

    let total = rows.len() as i64;
    let timestamps: Vec<DateTime<Utc>> = rows.iter().map(|r| r.timestamp).collect();
    let (maximum_per_day, average_per_day) = daily_activity(&timestamps, watermark);

    let population_sum: i64 = rows.iter().map(|r| r.population).sum();
    let maximum_population = rows.iter().map(|r| r.population).max().unwrap_or(0);

    ServerStat {
        endpoint: endpoint.to_string(),
        total_matches_played: total,
        maximum_matches_per_day: maximum_per_day,
        average_matches_per_day: average_per_day,
        maximum_population,
        average_population: population_sum as f64 / total as f64,
        top5_game_modes: top_by_frequency(rows.iter().map(|r| r.game_mode.as_str()), TOP_LIST_LEN),
        top5_maps: top_by_frequency(rows.iter().map(|r| r.map.as_str()), TOP_LIST_LEN),
    }
}

/// `name_key` is the case-folded player name the rows were scanned for
pub fn player_stat(
    name_key: &str,
    rows: &[PlayerMatchRow],
    watermark: Option<DateTime<Utc>>,
) -> PlayerStat {
    if rows.is_empty() {
        return PlayerStat {
            name: name_key.to_string(),
            ..Default::default()
        };
    }

    let total = rows.len() as i64;
    let timestamps: Vec<DateTime<Utc>> = rows.iter().map(|r| r.timestamp).collect();
    let (maximum_per_day, average_per_day) = daily_activity(&timestamps, watermark);

    let unique_servers = rows
        .iter()
        .map(|r| r.server.as_str())
        .collect::<HashSet<_>>()
        .len() as i64;

    let percent_sum: f64 = rows
        .iter()
        .map(|r| scoreboard_percent(r.population, r.place))
        .sum();

    let kills: i64 = rows.iter().map(|r| r.kills).sum();
    let deaths: i64 = rows.iter().map(|r| r.deaths).sum();
    let kill_to_death_ratio = if deaths > 0 {
        kills as f64 / deaths as f64
    } else {
        0.0
    };

    PlayerStat {
        name: name_key.to_string(),
        total_matches_played: total,
        total_matches_won: rows.iter().filter(|r| r.place == 1).count() as i64,
        favorite_server: favorite(rows.iter().map(|r| r.server.as_str())),
        unique_servers,
        favorite_game_mode: favorite(rows.iter().map(|r| r.game_mode.as_str())),
        average_scoreboard_percent: percent_sum / total as f64,
        maximum_matches_per_day: maximum_per_day,
        average_matches_per_day: average_per_day,
        last_match_played: timestamps.iter().max().copied(),
        kill_to_death_ratio,
    }
}

/// Share of the scoreboard a player finished above, as a percentage
///
/// A lone player counts as 100.
pub fn scoreboard_percent(population: i64, place: i64) -> f64 {
    if population <= 1 {
        return 100.0;
    }
    (population - place) as f64 / (population - 1) as f64 * 100.0
}

/// Busiest day count and matches-per-day average over the watermark span
///
/// The watermark never moves the span end before the latest row.
fn daily_activity(timestamps: &[DateTime<Utc>], watermark: Option<DateTime<Utc>>) -> (i64, f64) {
    let mut per_day: HashMap<NaiveDate, i64> = HashMap::new();
    for ts in timestamps {
        *per_day.entry(ts.date_naive()).or_insert(0) += 1;
    }
    let maximum = per_day.values().copied().max().unwrap_or(0);

    let (first, last) = match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return (0, 0.0),
    };
    let end = watermark.map_or(last, |w| w.max(last));
    let day_span = (end.date_naive() - first.date_naive()).num_days() + 1;

    (maximum, timestamps.len() as f64 / day_span as f64)
}

/// Up to `limit` distinct values, most frequent first, ties by value ascending
pub fn top_by_frequency<'a, I>(values: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(value, _)| value.to_string())
        .collect()
}

fn favorite<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    top_by_frequency(values, 1).into_iter().next()
}
