//! Client Configuration

use da_types::{instruction::LedgerPrograms, Address, DEFAULT_EXPIRY_SECS};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::keypair::read_keypair_file};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Settings are checked before anything touches the ledger
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No signing key: pass --keypair or --private-key")]
    MissingCredentials,

    #[error("Failed to read keypair file {path}: {reason}")]
    KeypairFile { path: String, reason: String },

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Missing program id for {0}")]
    MissingProgramId(&'static str),

    #[error("Invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid {field} key {value:?}")]
    InvalidKey { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Expiry of {secs}s exceeds the {max}s limit")]
    ExpiryTooLong { secs: u64, max: u64 },
}

/// Longest accepted record lifetime (one year)
pub const MAX_EXPIRY_SECS: u64 = 365 * 24 * 60 * 60;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ledger RPC URL
    pub rpc_url: String,
    /// Node manager program id (base58)
    pub node_manager: String,
    /// Storage manager program id (base58)
    pub storage_manager: String,
    /// Commitment manager program id (base58)
    pub commitment_manager: String,
    /// Per-node attestation timeout
    pub node_timeout_secs: u64,
    /// Ledger transaction confirmation timeout
    pub confirm_timeout_secs: u64,
    /// Submission record lifetime
    pub expiry_secs: u64,
    /// Delay between submission cycles
    pub interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            node_manager: String::new(),
            storage_manager: String::new(),
            commitment_manager: String::new(),
            node_timeout_secs: 30,
            confirm_timeout_secs: 90,
            expiry_secs: DEFAULT_EXPIRY_SECS as u64,
            interval_secs: 300,
        }
    }
}

impl ClientConfig {
    pub fn programs(&self) -> Result<LedgerPrograms, ConfigError> {
        Ok(LedgerPrograms {
            node_manager: program_id("node manager", &self.node_manager)?,
            storage_manager: program_id("storage manager", &self.storage_manager)?,
            commitment_manager: program_id("commitment manager", &self.commitment_manager)?,
        })
    }

    pub fn node_timeout(&self) -> Result<Duration, ConfigError> {
        positive("node timeout", self.node_timeout_secs)
    }

    pub fn confirm_timeout(&self) -> Result<Duration, ConfigError> {
        positive("confirm timeout", self.confirm_timeout_secs)
    }

    pub fn expiry(&self) -> Result<Duration, ConfigError> {
        if self.expiry_secs > MAX_EXPIRY_SECS {
            return Err(ConfigError::ExpiryTooLong {
                secs: self.expiry_secs,
                max: MAX_EXPIRY_SECS,
            });
        }
        positive("expiry", self.expiry_secs)
    }

    /// Zero runs cycles back to back
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn program_id(name: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingProgramId(name));
    }
    parse_address(name, value)
}

fn positive(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration(name));
    }
    Ok(Duration::from_secs(secs))
}

pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    Pubkey::from_str(value.trim()).map_err(|_| ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

pub fn parse_addresses(field: &'static str, values: &[String]) -> Result<Vec<Address>, ConfigError> {
    values.iter().map(|v| parse_address(field, v)).collect()
}

/// Parse a base58 registry key; empty input is the zero key
pub fn parse_key<K: FromStr + Default>(field: &'static str, value: &str) -> Result<K, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(K::default());
    }
    K::from_str(value).map_err(|_| ConfigError::InvalidKey {
        field,
        value: value.to_string(),
    })
}

/// Load the signing key from a keypair file or a base58 private key
///
/// The file wins when both are given.
pub fn load_keypair(path: Option<&Path>, private_key: Option<&str>) -> Result<Keypair, ConfigError> {
    if let Some(path) = path {
        return read_keypair_file(path).map_err(|e| ConfigError::KeypairFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        });
    }

    let encoded = private_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::MissingCredentials)?;
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
    Keypair::from_bytes(&bytes).map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
}
