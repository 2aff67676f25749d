use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The job payload does not carry a usable lead id. The job is failed
    /// permanently; there is nothing to retry.
    #[error("invalid job payload: missing lead_id")]
    InvalidJobPayload,

    #[error("lead {0} not found")]
    LeadNotFound(i64),

    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// A lead reached the delivery stage without a stored customer payload,
    /// which the status machine is supposed to make impossible.
    #[error("lead {0} has no customer payload")]
    MissingCustomerPayload(i64),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Queue(#[from] queue::QueueError),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
