//! Ledger Errors

use da_types::{state::AccountDecodeError, Address};
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Failure reading or writing ledger state
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("RPC call failed: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Account {address} could not be decoded: {source}")]
    Decode {
        address: Address,
        #[source]
        source: AccountDecodeError,
    },

    #[error("Transaction encoding failed: {0}")]
    Encode(String),

    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },

    #[error("Transaction {0} not confirmed before timeout")]
    ConfirmationTimeout(Signature),

    #[error("Rejected by ledger program: {0}")]
    Rejected(String),
}

/// Failure registering a node group or namespace
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Ledger call failed: {0}")]
    Chain(#[from] LedgerError),

    #[error("Derived registry key is zero")]
    ZeroKey,

    #[error("Member list is empty")]
    EmptyMembers,

    #[error("Duplicate member {0}")]
    DuplicateMember(Address),

    #[error("Threshold {threshold} outside 1..={members}")]
    InvalidThreshold { threshold: u64, members: usize },
}
