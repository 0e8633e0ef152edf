//! Certificate Submitter - anchors one submission record per call

use da_ledger::{Ledger, TxSignature};
use da_types::{AttestationSlot, Commitment, NamespaceKey, NodeGroupKey, SubmissionRecord};
use std::sync::Arc;

use crate::error::SubmissionError;

/// Bundles a cycle's results into one commitment ledger transaction
pub struct CertificateSubmitter {
    ledger: Arc<dyn Ledger>,
}

impl CertificateSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Send the record and block until it is confirmed
    ///
    /// The attestation array is forwarded as is, absent slots included; the
    /// ledger decides whether enough signatures are present.
    pub async fn submit(
        &self,
        length: u64,
        node_group_key: NodeGroupKey,
        attestations: Vec<AttestationSlot>,
        commitment: Commitment,
        namespace_key: NamespaceKey,
        expiry: i64,
    ) -> Result<TxSignature, SubmissionError> {
        let now = chrono::Utc::now().timestamp();
        let record = SubmissionRecord::assemble(
            length,
            expiry,
            namespace_key,
            node_group_key,
            attestations,
            commitment,
            now,
        )?;

        tracing::info!(
            "Submitting commitment: {} bytes, {} of {} signatures, expiry {}",
            record.length,
            record.signed_count(),
            record.attestations.len(),
            record.expiry
        );

        let signature = self.ledger.submit_commitment(record).await?;
        tracing::info!("Commitment anchored in tx {}", signature);
        Ok(signature)
    }
}
