//! Ledger client interface
//!
//! One trait covers the three ledger programs so the collector, the
//! registries and the submitter can share a single client object.

use async_trait::async_trait;
use da_types::{
    Address, Namespace, NamespaceKey, NodeGroup, NodeGroupKey, NodeInfo, SubmissionRecord,
};

use crate::error::LedgerError;

/// Confirmed transaction id
pub type TxSignature = solana_sdk::signature::Signature;

/// Read/write access to the node directory, registry and commitment ledger
///
/// Every write blocks until the transaction is confirmed or the ledger
/// reports a failure.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Account that signs and pays for writes
    fn payer(&self) -> Address;

    /// All broadcast node entries, including zero-staked ones
    async fn broadcast_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError>;

    /// All storage node entries, including zero-staked ones
    async fn storage_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError>;

    async fn broadcast_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError>;

    async fn storage_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError>;

    async fn node_group(&self, key: &NodeGroupKey) -> Result<Option<NodeGroup>, LedgerError>;

    async fn namespace(&self, key: &NamespaceKey) -> Result<Option<Namespace>, LedgerError>;

    /// Number of records the sender has anchored so far
    async fn sender_index(&self, sender: &Address) -> Result<u64, LedgerError>;

    async fn register_broadcast_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError>;

    async fn register_storage_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError>;

    async fn register_node_group(
        &self,
        members: Vec<Address>,
        threshold: u64,
    ) -> Result<TxSignature, LedgerError>;

    async fn register_namespace(&self, members: Vec<Address>) -> Result<TxSignature, LedgerError>;

    /// Anchor one submission record signed by the payer
    async fn submit_commitment(&self, record: SubmissionRecord)
        -> Result<TxSignature, LedgerError>;
}
