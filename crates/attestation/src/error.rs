//! Attestation Errors

use da_ledger::LedgerError;
use da_types::{Address, NodeGroupKey};
use thiserror::Error;

/// One member's attestation failed; recorded as an absent slot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeAttestationError {
    #[error("Node {0} is not in the broadcast node directory")]
    UnknownNode(Address),

    #[error("Node {0} has no stake or no endpoint")]
    InactiveNode(Address),

    #[error("Endpoint lookup failed: {0}")]
    EndpointLookup(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Node refused to sign: {0}")]
    Refused(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Collection could not start because the node group is unavailable
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Node group {0} is not registered")]
    UnknownNodeGroup(NodeGroupKey),

    #[error("Node group lookup failed: {0}")]
    Ledger(#[from] LedgerError),
}
