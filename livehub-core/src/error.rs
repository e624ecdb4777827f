use thiserror::Error;

/// PostgreSQL SQLSTATE codes the stores translate into domain errors
mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const NOT_NULL_VIOLATION: &str = "23502";
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A write carried an older version than the stored record
    #[error("Stale write rejected")]
    StaleWrite,
}

impl Error {
    /// Whether the failure came from the storage backend rather than the caller
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_) | Self::Internal(_))
    }

    fn from_sqlstate(code: &str) -> Option<Self> {
        let err = match code {
            sqlstate::UNIQUE_VIOLATION => Self::AlreadyExists("Row".to_string()),
            sqlstate::FOREIGN_KEY_VIOLATION => Self::NotFound("Referenced row".to_string()),
            sqlstate::CHECK_VIOLATION => Self::InvalidInput("Value out of range".to_string()),
            sqlstate::NOT_NULL_VIOLATION => Self::InvalidInput("Missing value".to_string()),
            _ => return None,
        };
        Some(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound("Row".to_string());
        }
        let mapped = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .and_then(|code| Self::from_sqlstate(&code));
        mapped.unwrap_or(Self::Database(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
