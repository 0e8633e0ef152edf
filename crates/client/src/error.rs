//! Client Errors

use da_attestation::CollectionError;
use da_ledger::LedgerError;
use da_types::RecordError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("Payload is empty")]
    Empty,

    #[error("Payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("Commitment engine failed: {0}")]
    Engine(String),
}

/// The certificate transaction could not be built, sent or confirmed
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Invalid submission record: {0}")]
    Record(#[from] RecordError),

    #[error("Ledger submission failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Any failure that ends one submission cycle
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Commitment failed: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("Expiry of {0}s does not fit a unix timestamp")]
    ExpiryOutOfRange(u64),

    #[error("Sender index lookup failed: {0}")]
    SenderIndex(#[from] LedgerError),

    #[error("Attestation collection failed: {0}")]
    Collection(#[from] CollectionError),

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),
}
