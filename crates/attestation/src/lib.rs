//! DA Attestation - Signature collection from a node group
//!
//! Architecture:
//! - The node group's ordered membership is read from the registry
//! - Every member gets exactly one attestation request, all in flight at once
//! - Results land in the member's own slot; failures leave the slot absent
//! - No quorum check here, the commitment ledger enforces the threshold

pub mod collector;
pub mod error;
pub mod request;
pub mod state;
pub mod transport;

pub use collector::{AttestationCollector, CollectionReport, MemberAttestation};
pub use error::{CollectionError, NodeAttestationError};
pub use request::AttestationRequest;
pub use state::AttestationState;
pub use transport::{AttestationTransport, JsonRpcTransport, ATTESTATION_METHOD};
