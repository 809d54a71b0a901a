pub mod events;
pub mod policy;
pub mod repository;
pub mod ticket;

pub use policy::{SurgePolicy, SurgeTransition};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("PNR already in use: {0}")]
    DuplicatePnr(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
