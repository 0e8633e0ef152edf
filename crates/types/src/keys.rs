//! Registry key derivation
//!
//! Keys are sha256 digests over a domain tag and the ordered member list.
//! Member order is part of the identity: attestation arrays are positional
//! against it, so `[a, b]` and `[b, a]` are different groups.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::hash::hashv;
use std::{fmt, str::FromStr};

use crate::Address;

const NODE_GROUP_DOMAIN: &[u8] = b"node_group";
const NAMESPACE_DOMAIN: &[u8] = b"namespace";

/// Error parsing a base58 registry key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyError {
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),
    #[error("Expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

macro_rules! digest_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            BorshSerialize,
            BorshDeserialize,
            Serialize,
            Deserialize,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
        )]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn to_bytes(&self) -> [u8; 32] {
                self.0
            }

            /// The zero key never identifies a registered record
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", bs58::encode(self.0).into_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseKeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = bs58::decode(s)
                    .into_vec()
                    .map_err(|e| ParseKeyError::InvalidBase58(e.to_string()))?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|b: Vec<u8>| ParseKeyError::InvalidLength(b.len()))?;
                Ok(Self(bytes))
            }
        }
    };
}

digest_key!(
    /// Identifies a registered node group
    NodeGroupKey
);

digest_key!(
    /// Identifies a registered namespace
    NamespaceKey
);

/// Derive the key of a node group from its ordered members and threshold
pub fn node_group_key(members: &[Address], threshold: u64) -> NodeGroupKey {
    let threshold = threshold.to_le_bytes();
    let count = (members.len() as u32).to_le_bytes();

    let mut parts: Vec<&[u8]> = Vec::with_capacity(members.len() + 3);
    parts.push(NODE_GROUP_DOMAIN);
    parts.push(&threshold);
    parts.push(&count);
    parts.extend(members.iter().map(|m| m.as_ref()));

    NodeGroupKey(hashv(&parts).to_bytes())
}

/// Derive the key of a namespace from its ordered storage nodes
pub fn namespace_key(members: &[Address]) -> NamespaceKey {
    let count = (members.len() as u32).to_le_bytes();

    let mut parts: Vec<&[u8]> = Vec::with_capacity(members.len() + 2);
    parts.push(NAMESPACE_DOMAIN);
    parts.push(&count);
    parts.extend(members.iter().map(|m| m.as_ref()));

    NamespaceKey(hashv(&parts).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_node_group_key_is_deterministic() {
        let members = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        assert_eq!(node_group_key(&members, 2), node_group_key(&members, 2));
        assert!(!node_group_key(&members, 2).is_zero());
    }

    #[test]
    fn test_distinct_inputs_distinct_keys() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        assert_ne!(node_group_key(&[a, b], 1), node_group_key(&[a, b], 2));
        assert_ne!(node_group_key(&[a, b], 2), node_group_key(&[b, a], 2));
        assert_ne!(node_group_key(&[a], 1), node_group_key(&[a, b], 1));
        assert_ne!(namespace_key(&[a, b]), namespace_key(&[b, a]));
    }

    #[test]
    fn test_domains_are_separated() {
        let a = Pubkey::new_unique();
        assert_ne!(node_group_key(&[a], 0).0, namespace_key(&[a]).0);
    }

    #[test]
    fn test_key_string_roundtrip() {
        let key = namespace_key(&[Pubkey::new_unique()]);
        let parsed: NamespaceKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);

        assert_eq!(
            "11".parse::<NodeGroupKey>(),
            Err(ParseKeyError::InvalidLength(2))
        );
    }
}
