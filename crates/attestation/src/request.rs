//! Attestation request payload

use da_types::{Address, Commitment, NodeGroupKey, OpeningProof};

/// Everything a node needs to verify and sign one submission
#[derive(Debug, Clone)]
pub struct AttestationRequest {
    pub sender: Address,
    /// Sender's per-account sequence index on the commitment ledger
    pub index: u64,
    pub node_group_key: NodeGroupKey,
    pub commitment: Commitment,
    pub proof: OpeningProof,
    /// Unix seconds
    pub expiry: i64,
    pub data: Vec<u8>,
}

impl AttestationRequest {
    /// Payload length carried on the wire
    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }
}
