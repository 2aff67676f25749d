use common::TransitionError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lead {0} not found")]
    LeadNotFound(i64),

    /// A code path attempted an illegal status move. The surrounding
    /// transaction must abort so audit history stays consistent.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}
