//! DA Ledger - Settlement chain access
//!
//! Handles communication with the settlement ledger:
//! - Node directory (broadcast and storage nodes)
//! - Node-group and namespace registry
//! - Commitment ledger (sender indices, submission records)

pub mod client;
pub mod directory;
pub mod error;
pub mod memory;
pub mod registry;
pub mod rpc;

pub use client::{Ledger, TxSignature};
pub use directory::NodeDirectory;
pub use error::{LedgerError, RegistrationError};
pub use memory::{LedgerTransaction, MemoryLedger};
pub use registry::{NamespaceRegistry, NamespaceResolution, NodeGroupRegistry, NodeGroupResolution};
pub use rpc::{RpcLedger, RpcLedgerConfig};
