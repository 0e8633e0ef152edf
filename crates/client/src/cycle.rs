//! Submission cycle
//!
//! commit -> expiry -> sender index -> collect -> submit. Every step either
//! succeeds or ends the cycle; nothing is retried inside a cycle.

use da_attestation::{AttestationCollector, AttestationRequest};
use da_ledger::{Ledger, TxSignature};
use da_types::{NamespaceKey, NodeGroupKey, DEFAULT_EXPIRY_SECS};
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;

use crate::commitment::CommitmentEngine;
use crate::error::CycleError;
use crate::submitter::CertificateSubmitter;

/// Static inputs shared by every cycle
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub node_group_key: NodeGroupKey,
    /// Zero key submits without a namespace
    pub namespace_key: NamespaceKey,
    /// Record lifetime measured from the start of the cycle
    pub expiry: Duration,
}

impl CycleConfig {
    pub fn new(node_group_key: NodeGroupKey, namespace_key: NamespaceKey) -> Self {
        Self {
            node_group_key,
            namespace_key,
            expiry: Duration::from_secs(DEFAULT_EXPIRY_SECS as u64),
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }
}

/// Result of one anchored cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub signature: TxSignature,
    /// Sender index the record was submitted under
    pub index: u64,
    pub length: u64,
    pub expiry: i64,
    pub signed: usize,
    pub absent: usize,
}

/// Totals of a periodic run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub succeeded: usize,
    pub failed: usize,
}

impl CycleStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct SubmissionCycle {
    ledger: Arc<dyn Ledger>,
    engine: Arc<dyn CommitmentEngine>,
    collector: AttestationCollector,
    submitter: CertificateSubmitter,
    config: CycleConfig,
}

impl SubmissionCycle {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        engine: Arc<dyn CommitmentEngine>,
        collector: AttestationCollector,
        config: CycleConfig,
    ) -> Self {
        Self {
            submitter: CertificateSubmitter::new(ledger.clone()),
            ledger,
            engine,
            collector,
            config,
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Run one full cycle for `data`
    pub async fn run_once(&self, data: Vec<u8>) -> Result<CycleReport, CycleError> {
        let (commitment, proof) = self.engine.commit(&data)?;
        let expiry = expiry_from(chrono::Utc::now().timestamp(), self.config.expiry)?;

        let sender = self.ledger.payer();
        let index = self.ledger.sender_index(&sender).await?;

        tracing::debug!(
            "Cycle for {} at index {}: {} bytes, expiry {}",
            sender,
            index,
            data.len(),
            expiry
        );

        let request = AttestationRequest {
            sender,
            index,
            node_group_key: self.config.node_group_key,
            commitment,
            proof,
            expiry,
            data,
        };
        let length = request.length();

        let report = self.collector.collect_report(&request).await?;
        let signed = report.signed_count();
        let absent = report.absent_count();

        // Submit even below threshold; quorum is the ledger's call
        let signature = self
            .submitter
            .submit(
                length,
                self.config.node_group_key,
                report.into_slots(),
                commitment,
                self.config.namespace_key,
                expiry,
            )
            .await?;

        Ok(CycleReport {
            signature,
            index,
            length,
            expiry,
            signed,
            absent,
        })
    }

    /// Run cycles back to back, sleeping `interval` after each one
    ///
    /// Failed cycles are logged and abandoned. Stops after `max_cycles`
    /// when set, otherwise runs until the task is dropped.
    pub async fn run_periodic<F>(
        &self,
        interval: Duration,
        mut source: F,
        max_cycles: Option<usize>,
    ) -> CycleStats
    where
        F: FnMut() -> Vec<u8>,
    {
        let mut stats = CycleStats::default();

        loop {
            if max_cycles.is_some_and(|max| stats.total() >= max) {
                break;
            }

            match self.run_once(source()).await {
                Ok(report) => {
                    stats.succeeded += 1;
                    tracing::info!(
                        "Cycle {} anchored: tx {}, {} signed, {} absent",
                        report.index,
                        report.signature,
                        report.signed,
                        report.absent
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!("Submission cycle failed: {}", e);
                }
            }

            if max_cycles.is_some_and(|max| stats.total() >= max) {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        stats
    }
}

/// Unix expiry `lifetime` after `now`
pub fn expiry_from(now: i64, lifetime: Duration) -> Result<i64, CycleError> {
    let secs = lifetime.as_secs();
    i64::try_from(secs)
        .ok()
        .and_then(|s| now.checked_add(s))
        .ok_or(CycleError::ExpiryOutOfRange(secs))
}

/// Random payload of `size` bytes
pub fn random_payload(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_rejects_overflow() {
        let now = 1_700_000_000;
        assert_eq!(expiry_from(now, Duration::from_secs(60)).unwrap(), now + 60);
        assert!(matches!(
            expiry_from(now, Duration::from_secs(i64::MAX as u64)),
            Err(CycleError::ExpiryOutOfRange(_))
        ));
        assert!(matches!(
            expiry_from(now, Duration::from_secs(u64::MAX)),
            Err(CycleError::ExpiryOutOfRange(s)) if s == u64::MAX
        ));
    }
}
