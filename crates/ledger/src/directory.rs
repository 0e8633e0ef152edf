//! Node directory - broadcast and storage node listings

use da_types::{Address, NodeInfo};
use std::sync::Arc;

use crate::client::{Ledger, TxSignature};
use crate::error::LedgerError;

/// Reads and registers entries in the node manager program
pub struct NodeDirectory {
    ledger: Arc<dyn Ledger>,
}

impl NodeDirectory {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Broadcast nodes with a non-zero stake
    pub async fn list_broadcast_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        Ok(active(self.ledger.broadcast_nodes().await?))
    }

    /// Storage nodes with a non-zero stake
    pub async fn list_storage_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        Ok(active(self.ledger.storage_nodes().await?))
    }

    pub async fn broadcast_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        self.ledger.broadcast_node(addr).await
    }

    pub async fn storage_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        self.ledger.storage_node(addr).await
    }

    /// Register the payer as a broadcast node; `info.addr` is overwritten
    pub async fn register_broadcast_node(
        &self,
        mut info: NodeInfo,
    ) -> Result<TxSignature, LedgerError> {
        info.addr = self.ledger.payer();
        let addr = info.addr;
        let signature = self.ledger.register_broadcast_node(info).await?;
        tracing::info!("Registered broadcast node {} in tx {}", addr, signature);
        Ok(signature)
    }

    /// Register the payer as a storage node; `info.addr` is overwritten
    pub async fn register_storage_node(
        &self,
        mut info: NodeInfo,
    ) -> Result<TxSignature, LedgerError> {
        info.addr = self.ledger.payer();
        let addr = info.addr;
        let signature = self.ledger.register_storage_node(info).await?;
        tracing::info!("Registered storage node {} in tx {}", addr, signature);
        Ok(signature)
    }
}

fn active(nodes: Vec<NodeInfo>) -> Vec<NodeInfo> {
    nodes.into_iter().filter(NodeInfo::is_active).collect()
}
