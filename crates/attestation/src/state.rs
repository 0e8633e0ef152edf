//! Per-member attestation state
//!
//! `Pending -> Requested -> {Signed | Failed}`. A member whose endpoint
//! cannot be resolved goes straight from `Pending` to `Failed`. Terminal
//! states never change again.

use da_types::AttestationSlot;

use crate::error::NodeAttestationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationState {
    Pending,
    Requested,
    Signed(Vec<u8>),
    Failed(NodeAttestationError),
}

impl AttestationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttestationState::Signed(_) | AttestationState::Failed(_))
    }

    /// Mark the request as sent
    pub fn requested(self) -> Self {
        match self {
            AttestationState::Pending => AttestationState::Requested,
            other => other,
        }
    }

    /// Apply the node's response to a sent request
    pub fn complete(self, result: Result<Vec<u8>, NodeAttestationError>) -> Self {
        match self {
            AttestationState::Requested => match result {
                Ok(signature) => AttestationState::Signed(signature),
                Err(e) => AttestationState::Failed(e),
            },
            other => other,
        }
    }

    /// Fail before a request was sent
    pub fn fail(self, error: NodeAttestationError) -> Self {
        if self.is_terminal() {
            return self;
        }
        AttestationState::Failed(error)
    }

    /// Anything short of `Signed` becomes an absent slot
    pub fn into_slot(self) -> AttestationSlot {
        match self {
            AttestationState::Signed(signature) => AttestationSlot::Signed(signature),
            _ => AttestationSlot::Absent,
        }
    }
}
