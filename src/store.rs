//! SQLite-backed persistent store for servers, matches and scoreboards
//!
//! Every operation opens its own connection, runs inside one transaction
//! and commits before returning. No connection or transaction state is
//! shared between calls, so a `Store` can be used from many threads at
//! once; SQLite's own locking serializes the writers.
//!
//! Tables (see `SCHEMA`):
//! - `servers` - keyed by endpoint, game modes kept as a JSON array
//! - `matches` - indexed by server ascending and by timestamp descending
//! - `scoreboard` - indexed by case-folded name and by match id

use crate::domain::{
    player_search_name, BestPlayer, Match, MatchResult, PlayerMatchRow, PopularServer,
    ScoreboardEntry, Server, ServerInfo, ServerMatchRow,
};
use crate::error::{Result, StatsError};
use crate::format::{from_sql_timestamp, to_sql_timestamp};
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};

/// Players need at least this many distinct matches to be ranked
pub const MIN_MATCHES_FOR_BEST_PLAYERS: i64 = 10;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS servers (
    endpoint    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    game_modes  TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS matches (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    server       TEXT NOT NULL,
    timestamp    TEXT NOT NULL,
    map          TEXT NOT NULL,
    game_mode    TEXT NOT NULL,
    frag_limit   INTEGER NOT NULL,
    time_limit   INTEGER NOT NULL,
    time_elapsed REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_matches_server ON matches(server ASC);
CREATE INDEX IF NOT EXISTS idx_matches_timestamp ON matches(timestamp DESC);

CREATE TABLE IF NOT EXISTS scoreboard (
    name         TEXT NOT NULL,
    search_name  TEXT NOT NULL,
    frags        INTEGER NOT NULL,
    kills        INTEGER NOT NULL,
    deaths       INTEGER NOT NULL,
    match_id     INTEGER NOT NULL,
    place        INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scoreboard_search_name ON scoreboard(search_name ASC);
CREATE INDEX IF NOT EXISTS idx_scoreboard_match_id ON scoreboard(match_id ASC);
"#;

pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Point the store at a database file, creating its directory if needed
    ///
    /// Does not create the schema; call `init` for that.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Ok(Self { db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        apply_optimized_pragmas(&conn)?;
        Ok(conn)
    }

    /// Create tables and indexes if they do not exist yet
    pub fn init(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;

        log::info!("✅ Stat store schema ready at {}", self.db_path.display());
        Ok(())
    }

    /// Drop all three tables
    pub fn drop_all(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS scoreboard;
             DROP TABLE IF EXISTS matches;
             DROP TABLE IF EXISTS servers;",
        )?;
        tx.commit()?;

        log::info!("🗑️  Dropped stat store tables at {}", self.db_path.display());
        Ok(())
    }

    /// Insert or replace the server row for `server.endpoint`
    pub fn upsert_server(&self, server: &Server) -> Result<()> {
        if server.endpoint.trim().is_empty() {
            return Err(StatsError::Validation(
                "server endpoint is required".to_string(),
            ));
        }

        let game_modes = serde_json::to_string(&server.info.game_modes)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO servers (endpoint, name, game_modes)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(endpoint) DO UPDATE SET
                 name = excluded.name,
                 game_modes = excluded.game_modes",
            params![server.endpoint, server.info.name, game_modes],
        )?;
        tx.commit()?;

        log::debug!("Upserted server {}", server.endpoint);
        Ok(())
    }

    /// Record a match unless it is already stored
    ///
    /// Returns `false` without writing when the server was never advertised.
    /// Returns `true` both for a fresh insert and for a repeat of an already
    /// stored `(server, timestamp)` pair.
    pub fn insert_match_if_new(&self, game_match: &Match) -> Result<bool> {
        let timestamp = to_sql_timestamp(&game_match.timestamp);

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !server_exists(&tx, &game_match.server)? {
            log::warn!(
                "Rejected match for unknown server {} at {}",
                game_match.server,
                timestamp
            );
            return Ok(false);
        }

        if find_match_id(&tx, &game_match.server, &timestamp)?.is_some() {
            log::debug!(
                "Match {} at {} already stored",
                game_match.server,
                timestamp
            );
            return Ok(true);
        }

        let results = &game_match.results;
        tx.execute(
            "INSERT INTO matches
             (server, timestamp, map, game_mode, frag_limit, time_limit, time_elapsed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                game_match.server,
                timestamp,
                results.map,
                results.game_mode,
                results.frag_limit,
                results.time_limit,
                results.time_elapsed,
            ],
        )?;
        let match_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO scoreboard
                 (name, search_name, frags, kills, deaths, match_id, place)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (index, entry) in results.scoreboard.iter().enumerate() {
                stmt.execute(params![
                    entry.name,
                    player_search_name(&entry.name),
                    entry.frags,
                    entry.kills,
                    entry.deaths,
                    match_id,
                    (index + 1) as i64,
                ])?;
            }
        }

        tx.commit()?;

        log::debug!(
            "Stored match {} at {} ({} players)",
            game_match.server,
            timestamp,
            results.population()
        );
        Ok(true)
    }

    pub fn get_server_info(&self, endpoint: &str) -> Result<Option<ServerInfo>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let info = tx
            .query_row(
                "SELECT name, game_modes FROM servers WHERE endpoint = ?1",
                params![endpoint],
                |row| server_info_from_row(row, 0),
            )
            .optional()?;
        tx.commit()?;
        Ok(info)
    }

    pub fn list_all_servers(&self) -> Result<Vec<Server>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let servers = {
            let mut stmt = tx.prepare("SELECT endpoint, name, game_modes FROM servers")?;
            let rows = stmt.query_map([], |row| {
                Ok(Server {
                    endpoint: row.get(0)?,
                    info: server_info_from_row(row, 1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(servers)
    }

    /// Full match result, scoreboard in submission order
    pub fn get_match_result(
        &self,
        endpoint: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Option<MatchResult>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let found = tx
            .query_row(
                "SELECT id, map, game_mode, frag_limit, time_limit, time_elapsed
                 FROM matches
                 WHERE server = ?1 AND timestamp = ?2
                 LIMIT 1",
                params![endpoint, to_sql_timestamp(timestamp)],
                |row| Ok((row.get::<_, i64>(0)?, match_result_from_row(row, 1)?)),
            )
            .optional()?;

        let result = match found {
            Some((match_id, mut result)) => {
                result.scoreboard = load_scoreboard(&tx, match_id)?;
                Some(result)
            }
            None => None,
        };

        tx.commit()?;
        Ok(result)
    }

    /// Latest `limit` matches, newest first, with hydrated scoreboards
    pub fn recent_matches(&self, limit: usize) -> Result<Vec<Match>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let headers = {
            let mut stmt = tx.prepare(
                "SELECT id, server, timestamp, map, game_mode, frag_limit, time_limit, time_elapsed
                 FROM matches
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    Match {
                        server: row.get(1)?,
                        timestamp: timestamp_from_row(row, 2)?,
                        results: match_result_from_row(row, 3)?,
                    },
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut matches = Vec::with_capacity(headers.len());
        for (match_id, mut game_match) in headers {
            game_match.results.scoreboard = load_scoreboard(&tx, match_id)?;
            matches.push(game_match);
        }

        tx.commit()?;
        Ok(matches)
    }

    /// One row per match of `endpoint`; population counts scoreboard rows
    pub fn scan_matches_for_server_stat(&self, endpoint: &str) -> Result<Vec<ServerMatchRow>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let rows = {
            let mut stmt = tx.prepare(
                "SELECT m.timestamp, COUNT(s.match_id), m.game_mode, m.map
                 FROM matches m
                 LEFT JOIN scoreboard s ON s.match_id = m.id
                 WHERE m.server = ?1
                 GROUP BY m.id
                 ORDER BY m.timestamp ASC",
            )?;
            let rows = stmt.query_map(params![endpoint], |row| {
                Ok(ServerMatchRow {
                    timestamp: timestamp_from_row(row, 0)?,
                    population: row.get(1)?,
                    game_mode: row.get(2)?,
                    map: row.get(3)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(rows)
    }

    /// One row per match the player appears in, name matched case-insensitively
    ///
    /// A name listed twice on one scoreboard is folded into a single row:
    /// kills and deaths summed, best place kept.
    pub fn scan_scoreboard_for_player(&self, name: &str) -> Result<Vec<PlayerMatchRow>> {
        let search_name = player_search_name(name);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let rows = {
            let mut stmt = tx.prepare(
                "SELECT SUM(s.kills), SUM(s.deaths), MIN(s.place),
                        m.server, m.timestamp, m.game_mode,
                        (SELECT COUNT(*) FROM scoreboard p WHERE p.match_id = m.id)
                 FROM scoreboard s
                 JOIN matches m ON m.id = s.match_id
                 WHERE s.search_name = ?1
                 GROUP BY m.id
                 ORDER BY m.timestamp ASC",
            )?;
            let rows = stmt.query_map(params![search_name], |row| {
                Ok(PlayerMatchRow {
                    kills: row.get(0)?,
                    deaths: row.get(1)?,
                    place: row.get(2)?,
                    server: row.get(3)?,
                    timestamp: timestamp_from_row(row, 4)?,
                    game_mode: row.get(5)?,
                    population: row.get(6)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(rows)
    }

    /// Timestamp of the most recent match across all servers
    pub fn get_last_match_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let watermark = last_match_timestamp(&tx)?;
        tx.commit()?;
        Ok(watermark)
    }

    /// Players ranked by total kills over total deaths
    ///
    /// Only players with at least one death and `MIN_MATCHES_FOR_BEST_PLAYERS`
    /// distinct matches qualify. Equal ratios are ordered by folded name.
    pub fn compute_best_players(&self, limit: usize) -> Result<Vec<BestPlayer>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let players = {
            let mut stmt = tx.prepare(
                "SELECT MIN(name), 1.0 * SUM(kills) / SUM(deaths) AS ratio
                 FROM scoreboard
                 GROUP BY search_name
                 HAVING SUM(deaths) > 0 AND COUNT(DISTINCT match_id) >= ?1
                 ORDER BY ratio DESC, search_name ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(
                params![MIN_MATCHES_FOR_BEST_PLAYERS, limit as i64],
                |row| {
                    Ok(BestPlayer {
                        name: row.get(0)?,
                        kill_to_death_ratio: row.get(1)?,
                    })
                },
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok(players)
    }

    /// Servers ranked by matches per day
    ///
    /// Each server's day span runs from the date of its own first match to
    /// the date of the latest match in the whole store, inclusive. Servers
    /// without matches are not listed.
    pub fn compute_popular_servers(&self, limit: usize) -> Result<Vec<PopularServer>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let servers = match last_match_timestamp(&tx)? {
            None => Vec::new(),
            Some(watermark) => {
                let mut stmt = tx.prepare(
                    "SELECT s.endpoint, s.name,
                            1.0 * COUNT(m.id) /
                            (julianday(date(?1)) - julianday(date(MIN(m.timestamp))) + 1) AS rate
                     FROM servers s
                     JOIN matches m ON m.server = s.endpoint
                     GROUP BY s.endpoint
                     ORDER BY rate DESC, s.endpoint ASC
                     LIMIT ?2",
                )?;
                let rows = stmt.query_map(
                    params![to_sql_timestamp(&watermark), limit as i64],
                    |row| {
                        Ok(PopularServer {
                            endpoint: row.get(0)?,
                            name: row.get(1)?,
                            average_matches_per_day: row.get(2)?,
                        })
                    },
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        tx.commit()?;
        Ok(servers)
    }

    /// Scoreboard rows stored for one match (0 when the match is unknown)
    pub fn count_scoreboard_rows(&self, endpoint: &str, timestamp: &DateTime<Utc>) -> Result<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let count = tx.query_row(
            "SELECT COUNT(*)
             FROM scoreboard s
             JOIN matches m ON m.id = s.match_id
             WHERE m.server = ?1 AND m.timestamp = ?2",
            params![endpoint, to_sql_timestamp(timestamp)],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(count)
    }
}

fn server_exists(conn: &Connection, endpoint: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM servers WHERE endpoint = ?1")?;
    stmt.exists(params![endpoint])
}

fn find_match_id(conn: &Connection, server: &str, timestamp: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM matches WHERE server = ?1 AND timestamp = ?2 LIMIT 1",
        params![server, timestamp],
        |row| row.get(0),
    )
    .optional()
}

fn last_match_timestamp(conn: &Connection) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> =
        conn.query_row("SELECT MAX(timestamp) FROM matches", [], |row| row.get(0))?;

    text.map(|text| {
        from_sql_timestamp(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn load_scoreboard(conn: &Connection, match_id: i64) -> rusqlite::Result<Vec<ScoreboardEntry>> {
    let mut stmt = conn.prepare(
        "SELECT name, frags, kills, deaths
         FROM scoreboard
         WHERE match_id = ?1
         ORDER BY place ASC",
    )?;
    let rows = stmt.query_map(params![match_id], |row| {
        Ok(ScoreboardEntry {
            name: row.get(0)?,
            frags: row.get(1)?,
            kills: row.get(2)?,
            deaths: row.get(3)?,
        })
    })?;
    rows.collect()
}

fn timestamp_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    from_sql_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads `name, game_modes` starting at column `first`
fn server_info_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<ServerInfo> {
    let game_modes: String = row.get(first + 1)?;
    let game_modes = serde_json::from_str(&game_modes).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(first + 1, Type::Text, Box::new(e))
    })?;

    Ok(ServerInfo {
        name: row.get(first)?,
        game_modes,
    })
}

/// Reads `map, game_mode, frag_limit, time_limit, time_elapsed` starting at
/// column `first`; the scoreboard is loaded separately
fn match_result_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<MatchResult> {
    Ok(MatchResult {
        map: row.get(first)?,
        game_mode: row.get(first + 1)?,
        frag_limit: row.get(first + 2)?,
        time_limit: row.get(first + 3)?,
        time_elapsed: row.get(first + 4)?,
        scoreboard: Vec::new(),
    })
}
