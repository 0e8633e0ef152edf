//! DA Client - Submission cycles against a node group
//!
//! A cycle commits to a payload, gathers attestations from every node group
//! member and anchors the resulting certificate on the commitment ledger:
//! - `CommitmentEngine` produces the commitment and opening proof
//! - `AttestationCollector` fans out to the node group
//! - `CertificateSubmitter` sends exactly one ledger transaction
//!
//! Cycles are independent. A failed cycle is dropped, never resumed.

pub mod commitment;
pub mod cycle;
pub mod error;
pub mod submitter;


pub use commitment::{CommitmentEngine, DigestCommitmentEngine};
pub use cycle::{random_payload, CycleConfig, CycleReport, CycleStats, SubmissionCycle};
pub use error::{CommitmentError, CycleError, SubmissionError};
pub use submitter::CertificateSubmitter;
