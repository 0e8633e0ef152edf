//! Shared types for the DA ledger programs
//!
//! This crate contains type definitions that mirror the on-chain node manager,
//! storage manager and commitment manager programs for (de)serialization,
//! plus the pure key derivation used to address node groups and namespaces.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

pub mod instruction;
pub mod keys;
pub mod state;

pub use keys::{namespace_key, node_group_key, NamespaceKey, NodeGroupKey};

/// Chain account identifier used for nodes, senders and registry members
pub type Address = Pubkey;

/// Maximum raw payload accepted for one submission (5 MiB)
pub const MAX_BLOB_SIZE: usize = 5 * 1024 * 1024;

/// Default lifetime of a submission record (10 hours)
pub const DEFAULT_EXPIRY_SECS: i64 = 10 * 60 * 60;

/// Registered broadcast or storage node (matches node manager NodeInfo)
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct NodeInfo {
    pub url: String,
    pub name: String,
    pub location: String,
    pub staked_tokens: u64,
    pub max_storage_space: u64,
    pub addr: Address,
}

impl NodeInfo {
    /// Zero-staked entries are deregistered or slashed nodes
    pub fn is_active(&self) -> bool {
        self.staked_tokens != 0
    }
}

/// Attesting node set plus the number of signatures the chain requires
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct NodeGroup {
    pub threshold: u64,
    pub members: Vec<Address>,
}

impl NodeGroup {
    pub fn new(members: Vec<Address>, threshold: u64) -> Self {
        Self { threshold, members }
    }

    pub fn key(&self) -> NodeGroupKey {
        node_group_key(&self.members, self.threshold)
    }

    pub fn is_registered(&self) -> bool {
        !self.members.is_empty()
    }
}

/// Storage node set associated with a class of submitted data
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct Namespace {
    pub members: Vec<Address>,
}

impl Namespace {
    pub fn new(members: Vec<Address>) -> Self {
        Self { members }
    }

    pub fn key(&self) -> NamespaceKey {
        namespace_key(&self.members)
    }

    pub fn is_registered(&self) -> bool {
        !self.members.is_empty()
    }
}

/// Polynomial commitment as an affine point (big-endian field elements)
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
)]
pub struct Commitment {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl Commitment {
    /// Uncompressed encoding: x followed by y
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.x);
        out[32..].copy_from_slice(&self.y);
        out
    }
}

/// Opening proof supporting a commitment
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub struct OpeningProof {
    /// Evaluation witness (quotient commitment)
    pub witness: Commitment,
    /// Claimed evaluation value
    pub claimed_value: [u8; 32],
}

/// One position in the attestation array
///
/// The array is aligned with the node group's member order, so a missing
/// signature is kept as `Absent` instead of being dropped.
#[derive(
    BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
)]
pub enum AttestationSlot {
    Signed(Vec<u8>),
    #[default]
    Absent,
}

impl AttestationSlot {
    pub fn is_signed(&self) -> bool {
        matches!(self, AttestationSlot::Signed(_))
    }

    pub fn signature(&self) -> Option<&[u8]> {
        match self {
            AttestationSlot::Signed(sig) => Some(sig),
            AttestationSlot::Absent => None,
        }
    }
}

impl From<Option<Vec<u8>>> for AttestationSlot {
    fn from(sig: Option<Vec<u8>>) -> Self {
        match sig {
            Some(sig) if !sig.is_empty() => AttestationSlot::Signed(sig),
            _ => AttestationSlot::Absent,
        }
    }
}

/// Errors assembling a submission record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Empty payload cannot be committed")]
    EmptyPayload,

    #[error("Expiry {expiry} is not after assembly time {now}")]
    Expired { expiry: i64, now: i64 },

    #[error("Attestation array is empty")]
    NoAttestationSlots,
}

/// Certificate anchored on the commitment ledger, one per cycle
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Byte length of the committed payload
    pub length: u64,
    /// Unix seconds after which nodes may drop the data
    pub expiry: i64,
    pub namespace_key: NamespaceKey,
    pub node_group_key: NodeGroupKey,
    /// Positionally aligned with the node group members
    pub attestations: Vec<AttestationSlot>,
    pub commitment: Commitment,
}

impl SubmissionRecord {
    /// Assemble a record at unix time `now`
    pub fn assemble(
        length: u64,
        expiry: i64,
        namespace_key: NamespaceKey,
        node_group_key: NodeGroupKey,
        attestations: Vec<AttestationSlot>,
        commitment: Commitment,
        now: i64,
    ) -> Result<Self, RecordError> {
        if length == 0 {
            return Err(RecordError::EmptyPayload);
        }
        if expiry <= now {
            return Err(RecordError::Expired { expiry, now });
        }
        if attestations.is_empty() {
            return Err(RecordError::NoAttestationSlots);
        }

        Ok(Self {
            length,
            expiry,
            namespace_key,
            node_group_key,
            attestations,
            commitment,
        })
    }

    /// Number of `Signed` slots
    pub fn signed_count(&self) -> usize {
        self.attestations.iter().filter(|s| s.is_signed()).count()
    }
}
