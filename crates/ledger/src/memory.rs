//! In-process ledger
//!
//! Keeps registry and commitment state in memory and applies the same
//! checks the on-chain programs do. Every confirmed write is appended to a
//! transaction log so callers can count what was actually sent.

use async_trait::async_trait;
use da_types::{
    namespace_key, node_group_key, Address, Namespace, NamespaceKey, NodeGroup, NodeGroupKey,
    NodeInfo, SubmissionRecord,
};
use parking_lot::RwLock;
use solana_sdk::signature::Signature;
use std::collections::HashMap;

use crate::client::{Ledger, TxSignature};
use crate::error::LedgerError;

/// A confirmed write applied to the in-memory ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerTransaction {
    RegisterBroadcastNode(Address),
    RegisterStorageNode(Address),
    RegisterNodeGroup(NodeGroupKey),
    RegisterNamespace(NamespaceKey),
    SubmitCommitment {
        sender: Address,
        index: u64,
        record: SubmissionRecord,
    },
}

#[derive(Default)]
struct LedgerState {
    broadcast_nodes: Vec<NodeInfo>,
    storage_nodes: Vec<NodeInfo>,
    node_groups: HashMap<NodeGroupKey, NodeGroup>,
    namespaces: HashMap<NamespaceKey, Namespace>,
    indices: HashMap<Address, u64>,
    transactions: Vec<(TxSignature, LedgerTransaction)>,
}

/// Ledger held in process memory
pub struct MemoryLedger {
    payer: Address,
    state: RwLock<LedgerState>,
    offline: RwLock<bool>,
}

impl MemoryLedger {
    /// Create an empty ledger whose writes are paid by `payer`
    pub fn new(payer: Address) -> Self {
        Self {
            payer,
            state: RwLock::new(LedgerState::default()),
            offline: RwLock::new(false),
        }
    }

    /// Make every call fail with `LedgerError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        *self.offline.write() = offline;
    }

    /// Insert a broadcast node directly, without a transaction
    pub fn seed_broadcast_node(&self, info: NodeInfo) {
        upsert(&mut self.state.write().broadcast_nodes, info);
    }

    /// Insert a node group directly, without a transaction
    pub fn seed_node_group(&self, group: NodeGroup) -> NodeGroupKey {
        let key = group.key();
        self.state.write().node_groups.insert(key, group);
        key
    }

    /// All confirmed writes in order
    pub fn transactions(&self) -> Vec<LedgerTransaction> {
        self.state
            .read()
            .transactions
            .iter()
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.read().transactions.len()
    }

    /// Submission records anchored so far
    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.state
            .read()
            .transactions
            .iter()
            .filter_map(|(_, tx)| match tx {
                LedgerTransaction::SubmitCommitment { record, .. } => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    fn check_online(&self) -> Result<(), LedgerError> {
        if *self.offline.read() {
            return Err(LedgerError::Unavailable("memory ledger is offline".to_string()));
        }
        Ok(())
    }

    fn confirm(state: &mut LedgerState, tx: LedgerTransaction) -> TxSignature {
        let signature = Signature::new_unique();
        tracing::debug!("memory ledger confirmed {}: {:?}", signature, tx);
        state.transactions.push((signature, tx));
        signature
    }

    fn check_submission(
        state: &LedgerState,
        record: &SubmissionRecord,
        now: i64,
    ) -> Result<(), LedgerError> {
        let group = state
            .node_groups
            .get(&record.node_group_key)
            .ok_or_else(|| LedgerError::Rejected("unknown node group".to_string()))?;

        if !record.namespace_key.is_zero() && !state.namespaces.contains_key(&record.namespace_key)
        {
            return Err(LedgerError::Rejected("unknown namespace".to_string()));
        }
        if record.attestations.len() != group.members.len() {
            return Err(LedgerError::Rejected(format!(
                "expected {} attestation slots, got {}",
                group.members.len(),
                record.attestations.len()
            )));
        }
        let signed = record.signed_count() as u64;
        if signed < group.threshold {
            return Err(LedgerError::Rejected(format!(
                "insufficient signatures: {} of {} required",
                signed, group.threshold
            )));
        }
        if record.expiry <= now {
            return Err(LedgerError::Rejected("record already expired".to_string()));
        }
        Ok(())
    }
}

fn upsert(nodes: &mut Vec<NodeInfo>, info: NodeInfo) {
    match nodes.iter_mut().find(|n| n.addr == info.addr) {
        Some(existing) => *existing = info,
        None => nodes.push(info),
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn payer(&self) -> Address {
        self.payer
    }

    async fn broadcast_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().broadcast_nodes.clone())
    }

    async fn storage_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().storage_nodes.clone())
    }

    async fn broadcast_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        self.check_online()?;
        let state = self.state.read();
        Ok(state.broadcast_nodes.iter().find(|n| &n.addr == addr).cloned())
    }

    async fn storage_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        self.check_online()?;
        let state = self.state.read();
        Ok(state.storage_nodes.iter().find(|n| &n.addr == addr).cloned())
    }

    async fn node_group(&self, key: &NodeGroupKey) -> Result<Option<NodeGroup>, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().node_groups.get(key).cloned())
    }

    async fn namespace(&self, key: &NamespaceKey) -> Result<Option<Namespace>, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().namespaces.get(key).cloned())
    }

    async fn sender_index(&self, sender: &Address) -> Result<u64, LedgerError> {
        self.check_online()?;
        Ok(self.state.read().indices.get(sender).copied().unwrap_or(0))
    }

    async fn register_broadcast_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError> {
        self.check_online()?;
        let mut state = self.state.write();
        let addr = info.addr;
        upsert(&mut state.broadcast_nodes, info);
        Ok(Self::confirm(
            &mut state,
            LedgerTransaction::RegisterBroadcastNode(addr),
        ))
    }

    async fn register_storage_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError> {
        self.check_online()?;
        let mut state = self.state.write();
        let addr = info.addr;
        upsert(&mut state.storage_nodes, info);
        Ok(Self::confirm(
            &mut state,
            LedgerTransaction::RegisterStorageNode(addr),
        ))
    }

    async fn register_node_group(
        &self,
        members: Vec<Address>,
        threshold: u64,
    ) -> Result<TxSignature, LedgerError> {
        self.check_online()?;
        let key = node_group_key(&members, threshold);
        let mut state = self.state.write();
        if state.node_groups.contains_key(&key) {
            return Err(LedgerError::Rejected("node group already registered".to_string()));
        }
        state
            .node_groups
            .insert(key, NodeGroup::new(members, threshold));
        Ok(Self::confirm(
            &mut state,
            LedgerTransaction::RegisterNodeGroup(key),
        ))
    }

    async fn register_namespace(&self, members: Vec<Address>) -> Result<TxSignature, LedgerError> {
        self.check_online()?;
        let key = namespace_key(&members);
        let mut state = self.state.write();
        if state.namespaces.contains_key(&key) {
            return Err(LedgerError::Rejected("namespace already registered".to_string()));
        }
        state.namespaces.insert(key, Namespace::new(members));
        Ok(Self::confirm(
            &mut state,
            LedgerTransaction::RegisterNamespace(key),
        ))
    }

    async fn submit_commitment(
        &self,
        record: SubmissionRecord,
    ) -> Result<TxSignature, LedgerError> {
        self.check_online()?;
        let now = chrono::Utc::now().timestamp();
        let sender = self.payer;

        let mut state = self.state.write();
        Self::check_submission(&state, &record, now)?;

        let index = state.indices.get(&sender).copied().unwrap_or(0);
        state.indices.insert(sender, index + 1);
        Ok(Self::confirm(
            &mut state,
            LedgerTransaction::SubmitCommitment {
                sender,
                index,
                record,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_types::{AttestationSlot, Commitment};
    use solana_sdk::pubkey::Pubkey;

    fn record(key: NodeGroupKey, attestations: Vec<AttestationSlot>) -> SubmissionRecord {
        SubmissionRecord {
            length: 16,
            expiry: chrono::Utc::now().timestamp() + 600,
            namespace_key: NamespaceKey::default(),
            node_group_key: key,
            attestations,
            commitment: Commitment::default(),
        }
    }

    #[tokio::test]
    async fn test_submission_advances_index() {
        let payer = Pubkey::new_unique();
        let ledger = MemoryLedger::new(payer);
        let key = ledger.seed_node_group(NodeGroup::new(vec![Pubkey::new_unique()], 1));

        assert_eq!(ledger.sender_index(&payer).await.unwrap(), 0);
        ledger
            .submit_commitment(record(key, vec![AttestationSlot::Signed(vec![1; 65])]))
            .await
            .unwrap();
        assert_eq!(ledger.sender_index(&payer).await.unwrap(), 1);
        assert_eq!(ledger.records().len(), 1);
    }

    #[tokio::test]
    async fn test_threshold_enforced() {
        let ledger = MemoryLedger::new(Pubkey::new_unique());
        let members = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let key = ledger.seed_node_group(NodeGroup::new(members, 2));

        let err = ledger
            .submit_commitment(record(
                key,
                vec![AttestationSlot::Signed(vec![1; 65]), AttestationSlot::Absent],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_offline_fails_reads() {
        let ledger = MemoryLedger::new(Pubkey::new_unique());
        ledger.set_offline(true);
        assert!(matches!(
            ledger.broadcast_nodes().await,
            Err(LedgerError::Unavailable(_))
        ));
    }
}
