//! Node-group and namespace registry
//!
//! Keys are derived locally; the ledger is only asked whether a record is
//! already stored under them. Registration is idempotent: an existing record
//! is reused and no transaction is sent.

use da_types::{
    namespace_key, node_group_key, Address, Namespace, NamespaceKey, NodeGroup, NodeGroupKey,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::client::Ledger;
use crate::error::{LedgerError, RegistrationError};

/// Lookup result for a node group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeGroupResolution {
    pub key: NodeGroupKey,
    /// Stored record; empty membership when unregistered
    pub group: NodeGroup,
}

impl NodeGroupResolution {
    pub fn is_registered(&self) -> bool {
        self.group.is_registered()
    }
}

/// Lookup result for a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceResolution {
    pub key: NamespaceKey,
    /// Stored record; empty membership when unregistered
    pub namespace: Namespace,
}

impl NamespaceResolution {
    pub fn is_registered(&self) -> bool {
        self.namespace.is_registered()
    }
}

/// Resolves and registers node groups
pub struct NodeGroupRegistry {
    ledger: Arc<dyn Ledger>,
}

impl NodeGroupRegistry {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Derive the group key and read its record
    ///
    /// An unregistered group still yields its derived key with an empty
    /// record. Check `is_registered()`; the key itself is never zero for a
    /// real member list.
    pub async fn resolve(
        &self,
        members: &[Address],
        threshold: u64,
    ) -> Result<NodeGroupResolution, LedgerError> {
        let key = node_group_key(members, threshold);
        let group = self.ledger.node_group(&key).await?.unwrap_or_default();
        Ok(NodeGroupResolution { key, group })
    }

    /// Register the group unless it already exists; returns its key
    pub async fn register(
        &self,
        members: &[Address],
        threshold: u64,
    ) -> Result<NodeGroupKey, RegistrationError> {
        validate_members(members)?;
        if threshold == 0 || threshold > members.len() as u64 {
            return Err(RegistrationError::InvalidThreshold {
                threshold,
                members: members.len(),
            });
        }

        let resolution = self.resolve(members, threshold).await?;
        if resolution.key.is_zero() {
            return Err(RegistrationError::ZeroKey);
        }
        if resolution.is_registered() {
            tracing::info!(
                "Node group {} already registered, using it directly",
                resolution.key
            );
            return Ok(resolution.key);
        }

        let signature = self
            .ledger
            .register_node_group(members.to_vec(), threshold)
            .await?;
        tracing::info!(
            "Registered node group {} ({} members, threshold {}) in tx {}",
            resolution.key,
            members.len(),
            threshold,
            signature
        );
        Ok(resolution.key)
    }
}

/// Resolves and registers namespaces
pub struct NamespaceRegistry {
    ledger: Arc<dyn Ledger>,
}

impl NamespaceRegistry {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Derive the namespace key and read its record
    ///
    /// Same contract as [`NodeGroupRegistry::resolve`]: unregistered
    /// namespaces keep their derived key, so check `is_registered()`.
    pub async fn resolve(&self, members: &[Address]) -> Result<NamespaceResolution, LedgerError> {
        let key = namespace_key(members);
        let namespace = self.ledger.namespace(&key).await?.unwrap_or_default();
        Ok(NamespaceResolution { key, namespace })
    }

    /// Register the namespace unless it already exists; returns its key
    pub async fn register(&self, members: &[Address]) -> Result<NamespaceKey, RegistrationError> {
        validate_members(members)?;

        let resolution = self.resolve(members).await?;
        if resolution.key.is_zero() {
            return Err(RegistrationError::ZeroKey);
        }
        if resolution.is_registered() {
            tracing::info!(
                "Namespace {} already registered, using it directly",
                resolution.key
            );
            return Ok(resolution.key);
        }

        let signature = self.ledger.register_namespace(members.to_vec()).await?;
        tracing::info!(
            "Registered namespace {} ({} storage nodes) in tx {}",
            resolution.key,
            members.len(),
            signature
        );
        Ok(resolution.key)
    }
}

fn validate_members(members: &[Address]) -> Result<(), RegistrationError> {
    if members.is_empty() {
        return Err(RegistrationError::EmptyMembers);
    }
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !seen.insert(member) {
            return Err(RegistrationError::DuplicateMember(*member));
        }
    }
    Ok(())
}
