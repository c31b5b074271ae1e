/// Error type shared by the journal service.
/// Aggregation code never produces these; only input validation,
/// the entry stores and startup can fail.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("entry already exists: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("store API error: {status} {body}")]
    Store { status: u16, body: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for JournalError {
    fn from(e: reqwest::Error) -> Self {
        JournalError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(e: rusqlite::Error) -> Self {
        JournalError::Database(e.to_string())
    }
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(e.to_string())
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
