//! Ledger account layouts
//!
//! Every account stored by the DA programs starts with a one-byte kind tag
//! followed by the borsh-encoded body. Accounts may be allocated larger
//! than the body, so trailing bytes are ignored on decode.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::{Address, NamespaceKey, NodeGroupKey};

pub const BROADCAST_NODE_SEED: &[u8] = b"broadcast_node";
pub const STORAGE_NODE_SEED: &[u8] = b"storage_node";
pub const NODE_GROUP_SEED: &[u8] = b"node_group";
pub const NAMESPACE_SEED: &[u8] = b"namespace";
pub const SENDER_INDEX_SEED: &[u8] = b"index";
pub const COMMITMENT_SEED: &[u8] = b"commitment";

/// Account kind tag (first data byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountKind {
    BroadcastNode = 1,
    StorageNode = 2,
    NodeGroup = 3,
    Namespace = 4,
    SenderIndex = 5,
    Commitment = 6,
}

impl AccountKind {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Per-sender submission counter kept by the commitment manager
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SenderIndex {
    pub index: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountDecodeError {
    #[error("Account data is empty")]
    Empty,
    #[error("Unexpected account kind {found}, expected {expected}")]
    WrongKind { expected: u8, found: u8 },
    #[error("Borsh decode failed: {0}")]
    Borsh(#[from] borsh::io::Error),
}

/// Encode an account body with its kind tag
pub fn encode_account<T: BorshSerialize>(kind: AccountKind, body: &T) -> Vec<u8> {
    let mut data = vec![kind.tag()];
    // Writing into a Vec cannot fail
    let _ = body.serialize(&mut data);
    data
}

/// Decode an account body after checking its kind tag
pub fn decode_account<T: BorshDeserialize>(
    kind: AccountKind,
    data: &[u8],
) -> Result<T, AccountDecodeError> {
    let (&found, mut body) = data.split_first().ok_or(AccountDecodeError::Empty)?;
    if found != kind.tag() {
        return Err(AccountDecodeError::WrongKind {
            expected: kind.tag(),
            found,
        });
    }
    Ok(T::deserialize(&mut body)?)
}

/// Derive broadcast node PDA (node manager program)
pub fn derive_broadcast_node_pda(addr: &Address, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BROADCAST_NODE_SEED, addr.as_ref()], program_id)
}

/// Derive storage node PDA (node manager program)
pub fn derive_storage_node_pda(addr: &Address, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STORAGE_NODE_SEED, addr.as_ref()], program_id)
}

/// Derive node group PDA (storage manager program)
pub fn derive_node_group_pda(key: &NodeGroupKey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[NODE_GROUP_SEED, key.as_ref()], program_id)
}

/// Derive namespace PDA (storage manager program)
pub fn derive_namespace_pda(key: &NamespaceKey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[NAMESPACE_SEED, key.as_ref()], program_id)
}

/// Derive sender index PDA (commitment manager program)
pub fn derive_sender_index_pda(sender: &Address, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SENDER_INDEX_SEED, sender.as_ref()], program_id)
}

/// Derive commitment record PDA for a sender's `index`-th submission
pub fn derive_commitment_pda(sender: &Address, index: u64, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[COMMITMENT_SEED, sender.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeGroup;

    #[test]
    fn test_decode_ignores_padding() {
        let group = NodeGroup::new(vec![Pubkey::new_unique()], 1);
        let mut data = encode_account(AccountKind::NodeGroup, &group);
        data.extend_from_slice(&[0u8; 64]);

        let decoded: NodeGroup = decode_account(AccountKind::NodeGroup, &data).unwrap();
        assert_eq!(decoded, group);
    }

    #[test]
    fn test_decode_checks_kind() {
        let data = encode_account(AccountKind::SenderIndex, &SenderIndex { index: 7 });
        let err = decode_account::<SenderIndex>(AccountKind::Namespace, &data).unwrap_err();
        assert!(matches!(
            err,
            AccountDecodeError::WrongKind {
                expected: 4,
                found: 5
            }
        ));
        assert!(matches!(
            decode_account::<SenderIndex>(AccountKind::SenderIndex, &[]),
            Err(AccountDecodeError::Empty)
        ));
    }

    #[test]
    fn test_commitment_pda_depends_on_index() {
        let program = Pubkey::new_unique();
        let sender = Pubkey::new_unique();
        assert_ne!(
            derive_commitment_pda(&sender, 0, &program).0,
            derive_commitment_pda(&sender, 1, &program).0
        );
    }
}
