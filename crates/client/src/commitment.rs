//! Commitment engines
//!
//! The KZG engine used in production lives outside this workspace and is
//! plugged in through `CommitmentEngine`. `DigestCommitmentEngine` gives
//! development networks deterministic, well-formed commitments without a
//! trusted setup; it is not a polynomial commitment and proves nothing.

use da_types::{Commitment, OpeningProof, MAX_BLOB_SIZE};

use crate::error::CommitmentError;

/// Produces a commitment and opening proof for a raw blob
pub trait CommitmentEngine: Send + Sync {
    fn commit(&self, data: &[u8]) -> Result<(Commitment, OpeningProof), CommitmentError>;
}

/// Reject blobs the ledger and nodes would refuse
pub fn check_blob(data: &[u8]) -> Result<(), CommitmentError> {
    if data.is_empty() {
        return Err(CommitmentError::Empty);
    }
    if data.len() > MAX_BLOB_SIZE {
        return Err(CommitmentError::TooLarge {
            size: data.len(),
            max: MAX_BLOB_SIZE,
        });
    }
    Ok(())
}

/// blake3-based stand-in for devnets
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestCommitmentEngine;

impl DigestCommitmentEngine {
    fn digest(context: &str, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }
}

impl CommitmentEngine for DigestCommitmentEngine {
    fn commit(&self, data: &[u8]) -> Result<(Commitment, OpeningProof), CommitmentError> {
        check_blob(data)?;

        let length = (data.len() as u64).to_le_bytes();
        let commitment = Commitment {
            x: Self::digest("da-client commitment x", &[&length, data]),
            y: Self::digest("da-client commitment y", &[&length, data]),
        };

        let point = commitment.to_bytes();
        let proof = OpeningProof {
            witness: Commitment {
                x: Self::digest("da-client witness x", &[&point]),
                y: Self::digest("da-client witness y", &[&point]),
            },
            claimed_value: Self::digest("da-client claimed value", &[&point, data]),
        };

        Ok((commitment, proof))
    }
}
