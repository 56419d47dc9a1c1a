//! Error type shared by the store and the service facade

#[derive(Debug)]
pub enum StatsError {
    /// Rejected input, raised before any database work happens
    Validation(String),
    Database(rusqlite::Error),
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatsError>;

impl From<rusqlite::Error> for StatsError {
    fn from(err: rusqlite::Error) -> Self {
        StatsError::Database(err)
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err)
    }
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::Io(err)
    }
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsError::Validation(msg) => write!(f, "Validation error: {}", msg),
            StatsError::Database(e) => write!(f, "Database error: {}", e),
            StatsError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StatsError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::Validation(_) => None,
            StatsError::Database(e) => Some(e),
            StatsError::Serialization(e) => Some(e),
            StatsError::Io(e) => Some(e),
        }
    }
}
