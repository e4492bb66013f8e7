use crate::application::session::SessionStep;
use crate::domain::transfer::TransferId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransferError>;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("principal not found: {0}")]
    PrincipalNotFound(String),
    #[error("payment step '{step}' failed: {reason}")]
    PaymentStepFailed { step: SessionStep, reason: String },
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("concurrent wallet creation for principal {0}")]
    ConcurrencyConflict(String),
    #[error("transfer {0} not found")]
    NotFound(TransferId),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
