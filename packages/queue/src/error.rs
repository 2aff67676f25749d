use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue transport cannot be reached. Surfaced to callers as-is;
    /// the queue never retries on its own.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl QueueError {
    /// Classify a database error, pulling connection-level failures out as
    /// `Unavailable` so callers can answer 503 instead of 500.
    pub fn from_db(err: DbErr) -> Self {
        match err {
            DbErr::Conn(e) => QueueError::Unavailable(e.to_string()),
            DbErr::ConnectionAcquire(e) => QueueError::Unavailable(e.to_string()),
            other => QueueError::Db(other),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, QueueError::Unavailable(_))
    }
}
