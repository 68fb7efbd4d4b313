use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Member already registered: {0}")]
    DuplicateMember(String),
    #[error("Invalid target role: {0}")]
    InvalidTargetRoles(String),
    #[error("Several meetings match, specify an id: {candidates:?}")]
    AmbiguousMeeting { candidates: Vec<i64> },
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// SQLite reports unique index violations with extended code 2067.
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
