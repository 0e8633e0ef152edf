//! DA Program Instructions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::state::{
    derive_broadcast_node_pda, derive_commitment_pda, derive_namespace_pda,
    derive_node_group_pda, derive_sender_index_pda, derive_storage_node_pda,
};
use crate::{namespace_key, node_group_key, Address, NodeInfo, SubmissionRecord};

/// Node manager instructions
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum NodeManagerInstruction {
    /// Register the signer as a broadcast (attesting) node
    ///
    /// Accounts:
    /// 0. `[writable]` Broadcast node account (PDA)
    /// 1. `[signer, writable]` Node authority / payer
    /// 2. `[]` System program
    RegisterBroadcastNode { info: NodeInfo },

    /// Register the signer as a storage node
    ///
    /// Accounts:
    /// 0. `[writable]` Storage node account (PDA)
    /// 1. `[signer, writable]` Node authority / payer
    /// 2. `[]` System program
    RegisterStorageNode { info: NodeInfo },
}

/// Storage manager instructions
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum StorageManagerInstruction {
    /// Register a node group; the program derives the key itself
    ///
    /// Accounts:
    /// 0. `[writable]` Node group account (PDA)
    /// 1. `[signer, writable]` Payer
    /// 2. `[]` System program
    RegisterNodeGroup {
        threshold: u64,
        members: Vec<Address>,
    },

    /// Register a namespace
    ///
    /// Accounts:
    /// 0. `[writable]` Namespace account (PDA)
    /// 1. `[signer, writable]` Payer
    /// 2. `[]` System program
    RegisterNamespace { members: Vec<Address> },
}

/// Commitment manager instructions
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum CommitmentManagerInstruction {
    /// Anchor a submission record; the program checks the node group
    /// threshold against the attestation array
    ///
    /// Accounts:
    /// 0. `[writable]` Sender index account (PDA)
    /// 1. `[writable]` Commitment record account (PDA)
    /// 2. `[]` Node group account (storage manager PDA)
    /// 3. `[]` Namespace account (storage manager PDA)
    /// 4. `[signer, writable]` Sender / payer
    /// 5. `[]` System program
    SubmitCommitment { record: SubmissionRecord },
}

/// Program ids of the three DA ledger programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPrograms {
    pub node_manager: Pubkey,
    pub storage_manager: Pubkey,
    pub commitment_manager: Pubkey,
}

pub fn register_broadcast_node(programs: &LedgerPrograms, info: NodeInfo) -> Instruction {
    let (node_pda, _) = derive_broadcast_node_pda(&info.addr, &programs.node_manager);
    let authority = info.addr;
    Instruction::new_with_borsh(
        programs.node_manager,
        &NodeManagerInstruction::RegisterBroadcastNode { info },
        registration_accounts(node_pda, authority),
    )
}

pub fn register_storage_node(programs: &LedgerPrograms, info: NodeInfo) -> Instruction {
    let (node_pda, _) = derive_storage_node_pda(&info.addr, &programs.node_manager);
    let authority = info.addr;
    Instruction::new_with_borsh(
        programs.node_manager,
        &NodeManagerInstruction::RegisterStorageNode { info },
        registration_accounts(node_pda, authority),
    )
}

pub fn register_node_group(
    programs: &LedgerPrograms,
    payer: &Pubkey,
    members: Vec<Address>,
    threshold: u64,
) -> Instruction {
    let key = node_group_key(&members, threshold);
    let (group_pda, _) = derive_node_group_pda(&key, &programs.storage_manager);
    Instruction::new_with_borsh(
        programs.storage_manager,
        &StorageManagerInstruction::RegisterNodeGroup { threshold, members },
        registration_accounts(group_pda, *payer),
    )
}

pub fn register_namespace(
    programs: &LedgerPrograms,
    payer: &Pubkey,
    members: Vec<Address>,
) -> Instruction {
    let key = namespace_key(&members);
    let (namespace_pda, _) = derive_namespace_pda(&key, &programs.storage_manager);
    Instruction::new_with_borsh(
        programs.storage_manager,
        &StorageManagerInstruction::RegisterNamespace { members },
        registration_accounts(namespace_pda, *payer),
    )
}

/// Build the submission instruction for the sender's `index`-th record
pub fn submit_commitment(
    programs: &LedgerPrograms,
    sender: &Pubkey,
    index: u64,
    record: SubmissionRecord,
) -> Instruction {
    let (index_pda, _) = derive_sender_index_pda(sender, &programs.commitment_manager);
    let (commitment_pda, _) = derive_commitment_pda(sender, index, &programs.commitment_manager);
    let (group_pda, _) = derive_node_group_pda(&record.node_group_key, &programs.storage_manager);
    let (namespace_pda, _) =
        derive_namespace_pda(&record.namespace_key, &programs.storage_manager);

    Instruction::new_with_borsh(
        programs.commitment_manager,
        &CommitmentManagerInstruction::SubmitCommitment { record },
        vec![
            AccountMeta::new(index_pda, false),
            AccountMeta::new(commitment_pda, false),
            AccountMeta::new_readonly(group_pda, false),
            AccountMeta::new_readonly(namespace_pda, false),
            AccountMeta::new(*sender, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

fn registration_accounts(target: Pubkey, payer: Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(target, false),
        AccountMeta::new(payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}
