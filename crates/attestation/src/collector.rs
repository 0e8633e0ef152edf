//! Attestation collector - fans one request out to every node group member
//!
//! Each member is handled by its own future that owns exactly one result
//! index. The futures run concurrently and are joined in member order, so
//! the output is positionally aligned with the group no matter which node
//! answers first.

use da_ledger::{Ledger, NodeDirectory};
use da_types::{Address, AttestationSlot, NodeGroup, NodeGroupKey};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CollectionError, NodeAttestationError};
use crate::request::AttestationRequest;
use crate::state::AttestationState;
use crate::transport::AttestationTransport;

/// Outcome for one node group member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAttestation {
    pub index: usize,
    pub address: Address,
    pub state: AttestationState,
}

/// Per-member outcomes of one collection, in group order
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub node_group_key: NodeGroupKey,
    pub threshold: u64,
    pub members: Vec<MemberAttestation>,
}

impl CollectionReport {
    pub fn signed_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| matches!(m.state, AttestationState::Signed(_)))
            .count()
    }

    pub fn absent_count(&self) -> usize {
        self.members.len() - self.signed_count()
    }

    /// Attestation array for the submission record
    pub fn into_slots(self) -> Vec<AttestationSlot> {
        self.members
            .into_iter()
            .map(|m| m.state.into_slot())
            .collect()
    }
}

/// Gathers signatures from every member of a node group
pub struct AttestationCollector {
    ledger: Arc<dyn Ledger>,
    directory: NodeDirectory,
    transport: Arc<dyn AttestationTransport>,
    /// Upper bound for one member (endpoint lookup plus request)
    node_timeout: Duration,
}

impl AttestationCollector {
    pub fn new(ledger: Arc<dyn Ledger>, transport: Arc<dyn AttestationTransport>) -> Self {
        Self {
            directory: NodeDirectory::new(ledger.clone()),
            ledger,
            transport,
            node_timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-member timeout
    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    /// Collect attestations; one slot per member, absent on failure
    pub async fn collect(
        &self,
        request: &AttestationRequest,
    ) -> Result<Vec<AttestationSlot>, CollectionError> {
        Ok(self.collect_report(request).await?.into_slots())
    }

    /// Collect attestations and keep each member's final state
    pub async fn collect_report(
        &self,
        request: &AttestationRequest,
    ) -> Result<CollectionReport, CollectionError> {
        let group = self.membership(&request.node_group_key).await?;

        tracing::debug!(
            "Requesting attestations from {} members of node group {}",
            group.members.len(),
            request.node_group_key
        );

        let tasks = group
            .members
            .iter()
            .enumerate()
            .map(|(index, address)| self.attest(index, *address, request));
        let members = join_all(tasks).await;

        let report = CollectionReport {
            node_group_key: request.node_group_key,
            threshold: group.threshold,
            members,
        };

        tracing::info!(
            "Node group {}: {} of {} attestations collected (threshold {})",
            report.node_group_key,
            report.signed_count(),
            report.members.len(),
            report.threshold
        );
        if (report.signed_count() as u64) < report.threshold {
            tracing::warn!(
                "Node group {} below threshold, the ledger will likely reject this record",
                report.node_group_key
            );
        }

        Ok(report)
    }

    async fn membership(&self, key: &NodeGroupKey) -> Result<NodeGroup, CollectionError> {
        match self.ledger.node_group(key).await? {
            Some(group) if group.is_registered() => Ok(group),
            _ => Err(CollectionError::UnknownNodeGroup(*key)),
        }
    }

    /// Drive one member to a terminal state
    async fn attest(
        &self,
        index: usize,
        address: Address,
        request: &AttestationRequest,
    ) -> MemberAttestation {
        let state = match tokio::time::timeout(self.node_timeout, self.run_member(address, request))
            .await
        {
            Ok(state) => state,
            Err(_) => AttestationState::Requested.fail(NodeAttestationError::Timeout),
        };

        if let AttestationState::Failed(ref e) = state {
            tracing::warn!("Attestation {} from {} absent: {}", index, address, e);
        }

        MemberAttestation {
            index,
            address,
            state,
        }
    }

    async fn run_member(&self, address: Address, request: &AttestationRequest) -> AttestationState {
        let state = AttestationState::Pending;

        let url = match self.directory.broadcast_node(&address).await {
            Ok(Some(info)) if info.is_active() && !info.url.is_empty() => info.url,
            Ok(Some(_)) => return state.fail(NodeAttestationError::InactiveNode(address)),
            Ok(None) => return state.fail(NodeAttestationError::UnknownNode(address)),
            Err(e) => return state.fail(NodeAttestationError::EndpointLookup(e.to_string())),
        };

        let state = state.requested();
        let result = self.transport.request_signature(&url, request).await;
        state.complete(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use da_ledger::MemoryLedger;
    use da_types::{Commitment, NodeInfo, OpeningProof};
    use parking_lot::Mutex;
    use solana_sdk::pubkey::Pubkey;
    use std::collections::HashMap;

    #[derive(Clone)]
    enum Behavior {
        Sign(Vec<u8>),
        Fail,
        Hang,
    }

    /// Transport keyed by node URL
    #[derive(Default)]
    struct MockTransport {
        behaviors: HashMap<String, Behavior>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AttestationTransport for MockTransport {
        async fn request_signature(
            &self,
            url: &str,
            _request: &AttestationRequest,
        ) -> Result<Vec<u8>, NodeAttestationError> {
            self.calls.lock().push(url.to_string());
            match self.behaviors.get(url).cloned() {
                Some(Behavior::Sign(sig)) => Ok(sig),
                Some(Behavior::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(vec![0xFF; 65])
                }
                Some(Behavior::Fail) | None => {
                    Err(NodeAttestationError::Transport("connection refused".to_string()))
                }
            }
        }
    }

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        transport: Arc<MockTransport>,
        key: NodeGroupKey,
        members: Vec<Address>,
    }

    impl Fixture {
        fn collector(&self) -> AttestationCollector {
            AttestationCollector::new(self.ledger.clone(), self.transport.clone())
                .with_node_timeout(Duration::from_millis(200))
        }

        fn request(&self) -> AttestationRequest {
            AttestationRequest {
                sender: self.ledger.payer(),
                index: 0,
                node_group_key: self.key,
                commitment: Commitment::default(),
                proof: OpeningProof::default(),
                expiry: 2_000_000_000,
                data: vec![7; 128],
            }
        }
    }

    /// Register `behaviors.len()` nodes; `None` leaves a member out of the directory
    fn fixture(behaviors: Vec<Option<Behavior>>) -> Fixture {
        let ledger = Arc::new(MemoryLedger::new(Pubkey::new_unique()));
        let mut transport = MockTransport::default();
        let mut members = Vec::new();

        for (i, behavior) in behaviors.into_iter().enumerate() {
            let addr = Pubkey::new_unique();
            let url = format!("http://node-{}", i);
            members.push(addr);
            if let Some(behavior) = behavior {
                ledger.seed_broadcast_node(NodeInfo {
                    url: url.clone(),
                    name: format!("n{}", i + 1),
                    location: "eu".to_string(),
                    staked_tokens: 10,
                    max_storage_space: 1 << 30,
                    addr,
                });
                transport.behaviors.insert(url, behavior);
            }
        }

        let key = ledger.seed_node_group(NodeGroup::new(members.clone(), 2));
        Fixture {
            ledger,
            transport: Arc::new(transport),
            key,
            members,
        }
    }

    #[tokio::test]
    async fn test_third_node_times_out() {
        let sig1 = vec![1u8; 65];
        let sig2 = vec![2u8; 65];
        let f = fixture(vec![
            Some(Behavior::Sign(sig1.clone())),
            Some(Behavior::Sign(sig2.clone())),
            Some(Behavior::Hang),
        ]);

        let slots = f.collector().collect(&f.request()).await.unwrap();
        assert_eq!(
            slots,
            vec![
                AttestationSlot::Signed(sig1),
                AttestationSlot::Signed(sig2),
                AttestationSlot::Absent,
            ]
        );
    }

    #[tokio::test]
    async fn test_order_follows_membership_not_arrival() {
        // Slow first member, fast others
        let f = fixture(vec![
            Some(Behavior::Hang),
            Some(Behavior::Sign(vec![2; 65])),
            Some(Behavior::Sign(vec![3; 65])),
        ]);

        let report = f.collector().collect_report(&f.request()).await.unwrap();
        let addresses: Vec<Address> = report.members.iter().map(|m| m.address).collect();
        assert_eq!(addresses, f.members);
        assert_eq!(
            report.members[0].state,
            AttestationState::Failed(NodeAttestationError::Timeout)
        );
        assert_eq!(report.signed_count(), 2);
    }

    #[tokio::test]
    async fn test_all_failures_keep_full_length() {
        let f = fixture(vec![
            Some(Behavior::Fail),
            None,
            Some(Behavior::Fail),
            Some(Behavior::Fail),
        ]);

        let report = f.collector().collect_report(&f.request()).await.unwrap();
        assert_eq!(report.members.len(), 4);
        assert_eq!(report.absent_count(), 4);
        assert_eq!(
            report.members[1].state,
            AttestationState::Failed(NodeAttestationError::UnknownNode(f.members[1]))
        );

        let slots = report.into_slots();
        assert!(slots.iter().all(|s| *s == AttestationSlot::Absent));
    }

    #[tokio::test]
    async fn test_one_request_per_reachable_member() {
        let f = fixture(vec![
            Some(Behavior::Fail),
            Some(Behavior::Sign(vec![1; 65])),
            None,
        ]);

        f.collector().collect(&f.request()).await.unwrap();

        let mut calls = f.transport.calls.lock().clone();
        calls.sort();
        assert_eq!(calls, vec!["http://node-0", "http://node-1"]);
    }

    #[tokio::test]
    async fn test_unstaked_member_is_absent() {
        let f = fixture(vec![Some(Behavior::Sign(vec![1; 65])), Some(Behavior::Sign(vec![2; 65]))]);
        let mut info = f.ledger.broadcast_node(&f.members[1]).await.unwrap().unwrap();
        info.staked_tokens = 0;
        f.ledger.seed_broadcast_node(info);

        let slots = f.collector().collect(&f.request()).await.unwrap();
        assert!(slots[0].is_signed());
        assert_eq!(slots[1], AttestationSlot::Absent);
    }

    #[tokio::test]
    async fn test_unknown_node_group() {
        let f = fixture(vec![Some(Behavior::Fail)]);
        let mut request = f.request();
        request.node_group_key = NodeGroupKey::new([9u8; 32]);

        let err = f.collector().collect(&request).await.unwrap_err();
        assert!(matches!(err, CollectionError::UnknownNodeGroup(k) if k == request.node_group_key));
    }

    #[tokio::test]
    async fn test_ledger_outage_is_a_collection_error() {
        let f = fixture(vec![Some(Behavior::Fail)]);
        f.ledger.set_offline(true);

        let err = f.collector().collect(&f.request()).await.unwrap_err();
        assert!(matches!(err, CollectionError::Ledger(_)));
    }
}
