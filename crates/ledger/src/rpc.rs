//! JSON-RPC ledger client
//!
//! Talks to a Solana-compatible RPC endpoint over HTTP. Reads decode
//! program accounts directly; writes build, sign and send a transaction and
//! then poll its status until it is confirmed.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use da_types::{
    instruction::{self, LedgerPrograms},
    state::{
        decode_account, derive_broadcast_node_pda, derive_namespace_pda, derive_node_group_pda,
        derive_sender_index_pda, derive_storage_node_pda, AccountKind, SenderIndex,
    },
    Address, Namespace, NamespaceKey, NodeGroup, NodeGroupKey, NodeInfo, SubmissionRecord,
};
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Deserialize;
use serde_json::json;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::{str::FromStr, sync::Arc, time::Duration};

use crate::client::{Ledger, TxSignature};
use crate::error::LedgerError;

/// Commitment level used for reads and confirmation
const COMMITMENT: &str = "confirmed";

/// RPC ledger configuration
#[derive(Debug, Clone)]
pub struct RpcLedgerConfig {
    /// Ledger RPC URL
    pub rpc_url: String,
    /// Program ids of the DA ledger programs
    pub programs: LedgerPrograms,
    /// Timeout for a single RPC request
    pub request_timeout: Duration,
    /// How long to wait for a sent transaction to confirm
    pub confirm_timeout: Duration,
    /// Delay between signature status polls
    pub poll_interval: Duration,
}

impl RpcLedgerConfig {
    pub fn new(rpc_url: &str, programs: LedgerPrograms) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            programs,
            request_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(90),
            poll_interval: Duration::from_millis(500),
        }
    }
}

// ============ RPC Response Types ============

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    /// (data, encoding)
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Debug, Deserialize)]
struct BlockhashInfo {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

/// Ledger client backed by a JSON-RPC endpoint
pub struct RpcLedger {
    client: HttpClient,
    config: RpcLedgerConfig,
    payer: Arc<Keypair>,
}

impl RpcLedger {
    /// Create a new RPC ledger client signing with `payer`
    pub fn new(config: RpcLedgerConfig, payer: Keypair) -> Result<Self, LedgerError> {
        let client = HttpClientBuilder::default()
            .request_timeout(config.request_timeout)
            .build(&config.rpc_url)?;

        Ok(Self {
            client,
            config,
            payer: Arc::new(payer),
        })
    }

    /// Get the RPC URL
    pub fn rpc_url(&self) -> &str {
        &self.config.rpc_url
    }

    pub fn programs(&self) -> &LedgerPrograms {
        &self.config.programs
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let response: RpcResponse<Option<UiAccount>> = self
            .client
            .request(
                "getAccountInfo",
                rpc_params![
                    address.to_string(),
                    json!({ "encoding": "base64", "commitment": COMMITMENT })
                ],
            )
            .await?;

        response
            .value
            .map(|account| decode_base64(&account.data))
            .transpose()
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        kind: AccountKind,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, LedgerError> {
        let tag = bs58::encode([kind.tag()]).into_string();
        let accounts: Vec<KeyedAccount> = self
            .client
            .request(
                "getProgramAccounts",
                rpc_params![
                    program_id.to_string(),
                    json!({
                        "encoding": "base64",
                        "commitment": COMMITMENT,
                        "filters": [{ "memcmp": { "offset": 0, "bytes": tag } }],
                    })
                ],
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| {
                let pubkey = Pubkey::from_str(&keyed.pubkey)
                    .map_err(|e| LedgerError::InvalidResponse(format!("pubkey: {}", e)))?;
                Ok((pubkey, decode_base64(&keyed.account.data)?))
            })
            .collect()
    }

    async fn decoded<T: borsh::BorshDeserialize>(
        &self,
        address: &Pubkey,
        kind: AccountKind,
    ) -> Result<Option<T>, LedgerError> {
        match self.account_data(address).await? {
            Some(data) => decode_account(kind, &data)
                .map(Some)
                .map_err(|source| LedgerError::Decode {
                    address: *address,
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn list_nodes(&self, kind: AccountKind) -> Result<Vec<NodeInfo>, LedgerError> {
        let accounts = self
            .program_accounts(&self.config.programs.node_manager, kind)
            .await?;

        let mut nodes = Vec::with_capacity(accounts.len());
        for (address, data) in accounts {
            match decode_account::<NodeInfo>(kind, &data) {
                Ok(info) => nodes.push(info),
                Err(e) => tracing::warn!("Skipping undecodable node account {}: {}", address, e),
            }
        }
        Ok(nodes)
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let response: RpcResponse<BlockhashInfo> = self
            .client
            .request(
                "getLatestBlockhash",
                rpc_params![json!({ "commitment": COMMITMENT })],
            )
            .await?;

        Hash::from_str(&response.value.blockhash)
            .map_err(|e| LedgerError::InvalidResponse(format!("blockhash: {}", e)))
    }

    /// Sign, send and wait for one instruction
    async fn send_and_confirm(&self, instruction: Instruction) -> Result<Signature, LedgerError> {
        let blockhash = self.latest_blockhash().await?;
        let payer = self.payer.pubkey();
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&payer),
            &[self.payer.as_ref()],
            blockhash,
        );

        let tx_bytes = bincode::serialize(&tx).map_err(|e| LedgerError::Encode(e.to_string()))?;
        let sent: String = self
            .client
            .request(
                "sendTransaction",
                rpc_params![
                    BASE64.encode(tx_bytes),
                    json!({ "encoding": "base64", "preflightCommitment": COMMITMENT })
                ],
            )
            .await?;

        let signature = Signature::from_str(&sent)
            .map_err(|e| LedgerError::InvalidResponse(format!("signature: {}", e)))?;
        tracing::info!("tx sent: {}", signature);

        self.wait_for_confirmation(&signature).await?;
        tracing::info!("tx confirmed: {}", signature);
        Ok(signature)
    }

    async fn wait_for_confirmation(&self, signature: &Signature) -> Result<(), LedgerError> {
        let deadline = tokio::time::Instant::now() + self.config.confirm_timeout;

        loop {
            let response: RpcResponse<Vec<Option<SignatureStatus>>> = self
                .client
                .request(
                    "getSignatureStatuses",
                    rpc_params![
                        vec![signature.to_string()],
                        json!({ "searchTransactionHistory": true })
                    ],
                )
                .await?;

            if let Some(Some(status)) = response.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(LedgerError::TransactionFailed {
                        signature: *signature,
                        reason: err.to_string(),
                    });
                }
                if matches!(
                    status.confirmation_status.as_deref(),
                    Some("confirmed") | Some("finalized")
                ) {
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout(*signature));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    fn payer(&self) -> Address {
        self.payer.pubkey()
    }

    async fn broadcast_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        self.list_nodes(AccountKind::BroadcastNode).await
    }

    async fn storage_nodes(&self) -> Result<Vec<NodeInfo>, LedgerError> {
        self.list_nodes(AccountKind::StorageNode).await
    }

    async fn broadcast_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        let (pda, _) = derive_broadcast_node_pda(addr, &self.config.programs.node_manager);
        self.decoded(&pda, AccountKind::BroadcastNode).await
    }

    async fn storage_node(&self, addr: &Address) -> Result<Option<NodeInfo>, LedgerError> {
        let (pda, _) = derive_storage_node_pda(addr, &self.config.programs.node_manager);
        self.decoded(&pda, AccountKind::StorageNode).await
    }

    async fn node_group(&self, key: &NodeGroupKey) -> Result<Option<NodeGroup>, LedgerError> {
        let (pda, _) = derive_node_group_pda(key, &self.config.programs.storage_manager);
        self.decoded(&pda, AccountKind::NodeGroup).await
    }

    async fn namespace(&self, key: &NamespaceKey) -> Result<Option<Namespace>, LedgerError> {
        let (pda, _) = derive_namespace_pda(key, &self.config.programs.storage_manager);
        self.decoded(&pda, AccountKind::Namespace).await
    }

    async fn sender_index(&self, sender: &Address) -> Result<u64, LedgerError> {
        let (pda, _) = derive_sender_index_pda(sender, &self.config.programs.commitment_manager);
        let index: Option<SenderIndex> = self.decoded(&pda, AccountKind::SenderIndex).await?;
        Ok(index.unwrap_or_default().index)
    }

    async fn register_broadcast_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError> {
        let ix = instruction::register_broadcast_node(&self.config.programs, info);
        self.send_and_confirm(ix).await
    }

    async fn register_storage_node(&self, info: NodeInfo) -> Result<TxSignature, LedgerError> {
        let ix = instruction::register_storage_node(&self.config.programs, info);
        self.send_and_confirm(ix).await
    }

    async fn register_node_group(
        &self,
        members: Vec<Address>,
        threshold: u64,
    ) -> Result<TxSignature, LedgerError> {
        let ix = instruction::register_node_group(
            &self.config.programs,
            &self.payer.pubkey(),
            members,
            threshold,
        );
        self.send_and_confirm(ix).await
    }

    async fn register_namespace(&self, members: Vec<Address>) -> Result<TxSignature, LedgerError> {
        let ix =
            instruction::register_namespace(&self.config.programs, &self.payer.pubkey(), members);
        self.send_and_confirm(ix).await
    }

    async fn submit_commitment(
        &self,
        record: SubmissionRecord,
    ) -> Result<TxSignature, LedgerError> {
        let sender = self.payer.pubkey();
        let index = self.sender_index(&sender).await?;
        let ix = instruction::submit_commitment(&self.config.programs, &sender, index, record);
        self.send_and_confirm(ix).await
    }
}

fn decode_base64((data, encoding): &(String, String)) -> Result<Vec<u8>, LedgerError> {
    if encoding != "base64" {
        return Err(LedgerError::InvalidResponse(format!(
            "unexpected account encoding {}",
            encoding
        )));
    }
    BASE64
        .decode(data)
        .map_err(|e| LedgerError::InvalidResponse(format!("account data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_types::state::encode_account;
    use jsonrpsee::server::{RpcModule, Server, ServerHandle};
    use jsonrpsee::types::ErrorObjectOwned;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::HashMap;

    /// How the stub reports signature statuses
    #[derive(Clone, Copy)]
    enum Status {
        /// "processed" for the first n polls, then "confirmed"
        ConfirmAfter(usize),
        Failed,
        Unknown,
    }

    struct Stub {
        status: Status,
        polls: Mutex<usize>,
        sent: Mutex<Vec<Transaction>>,
        accounts: HashMap<String, Vec<u8>>,
    }

    fn programs() -> LedgerPrograms {
        LedgerPrograms {
            node_manager: Pubkey::new_unique(),
            storage_manager: Pubkey::new_unique(),
            commitment_manager: Pubkey::new_unique(),
        }
    }

    /// Serve the subset of the ledger RPC the client uses
    async fn spawn_ledger(
        status: Status,
        accounts: HashMap<String, Vec<u8>>,
    ) -> (String, Arc<Stub>, ServerHandle) {
        let server = Server::builder().build("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let stub = Arc::new(Stub {
            status,
            polls: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
            accounts,
        });

        let mut module = RpcModule::new(stub.clone());
        module
            .register_async_method("getLatestBlockhash", |_params, _ctx, _ext| async move {
                Ok::<_, ErrorObjectOwned>(json!({
                    "context": { "slot": 1 },
                    "value": { "blockhash": Hash::new_unique().to_string(), "lastValidBlockHeight": 100 }
                }))
            })
            .unwrap();
        module
            .register_async_method("sendTransaction", |params, ctx, _ext| async move {
                let (encoded, _config): (String, Value) = params.parse()?;
                let bytes = BASE64.decode(encoded).unwrap();
                let tx: Transaction = bincode::deserialize(&bytes).unwrap();
                let signature = tx.signatures[0].to_string();
                ctx.sent.lock().push(tx);
                Ok::<_, ErrorObjectOwned>(signature)
            })
            .unwrap();
        module
            .register_async_method("getSignatureStatuses", |params, ctx, _ext| async move {
                let (signatures, _config): (Vec<String>, Value) = params.parse()?;
                assert_eq!(signatures.len(), 1);
                let polls = {
                    let mut polls = ctx.polls.lock();
                    *polls += 1;
                    *polls
                };
                let status = match ctx.status {
                    Status::ConfirmAfter(n) if polls > n => {
                        json!({ "slot": 2, "confirmations": 0, "err": null, "confirmationStatus": "confirmed" })
                    }
                    Status::ConfirmAfter(_) => {
                        json!({ "slot": 2, "confirmations": 0, "err": null, "confirmationStatus": "processed" })
                    }
                    Status::Failed => json!({
                        "slot": 2,
                        "confirmations": 0,
                        "err": { "InstructionError": [0, { "Custom": 1 }] },
                        "confirmationStatus": "processed"
                    }),
                    Status::Unknown => Value::Null,
                };
                Ok::<_, ErrorObjectOwned>(json!({ "context": { "slot": 2 }, "value": [status] }))
            })
            .unwrap();
        module
            .register_async_method("getAccountInfo", |params, ctx, _ext| async move {
                let (address, _config): (String, Value) = params.parse()?;
                let value = match ctx.accounts.get(&address) {
                    Some(data) => json!({
                        "data": [BASE64.encode(data), "base64"],
                        "executable": false,
                        "lamports": 1,
                        "owner": "11111111111111111111111111111111",
                        "rentEpoch": 0
                    }),
                    None => Value::Null,
                };
                Ok::<_, ErrorObjectOwned>(json!({ "context": { "slot": 3 }, "value": value }))
            })
            .unwrap();

        let handle = server.start(module);
        (format!("http://{}", addr), stub, handle)
    }

    fn connect(url: &str, programs: LedgerPrograms) -> RpcLedger {
        let mut config = RpcLedgerConfig::new(url, programs);
        config.confirm_timeout = Duration::from_millis(200);
        config.poll_interval = Duration::from_millis(10);
        RpcLedger::new(config, Keypair::new()).unwrap()
    }

    #[test]
    fn test_decode_base64_account_data() {
        let data = (BASE64.encode([5u8, 1, 0]), "base64".to_string());
        assert_eq!(decode_base64(&data).unwrap(), vec![5, 1, 0]);

        let wrong = ("AQ==".to_string(), "base58".to_string());
        assert!(matches!(
            decode_base64(&wrong),
            Err(LedgerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_signature_status_parsing() {
        let value = json!({
            "context": { "slot": 10 },
            "value": [{ "slot": 9, "confirmations": null, "err": null, "confirmationStatus": "finalized" }, null]
        });
        let response: RpcResponse<Vec<Option<SignatureStatus>>> =
            serde_json::from_value(value).unwrap();

        let first = response.value[0].as_ref().unwrap();
        assert!(first.err.is_none());
        assert_eq!(first.confirmation_status.as_deref(), Some("finalized"));
        assert!(response.value[1].is_none());
    }

    #[test]
    fn test_account_info_parsing() {
        let value = json!({
            "context": { "slot": 3 },
            "value": { "data": ["AwE=", "base64"], "executable": false, "lamports": 1, "owner": "11111111111111111111111111111111", "rentEpoch": 0 }
        });
        let response: RpcResponse<Option<UiAccount>> = serde_json::from_value(value).unwrap();
        let account = response.value.unwrap();
        assert_eq!(decode_base64(&account.data).unwrap(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_new_rejects_bad_url() {
        let programs = LedgerPrograms {
            node_manager: Pubkey::new_unique(),
            storage_manager: Pubkey::new_unique(),
            commitment_manager: Pubkey::new_unique(),
        };
        let config = RpcLedgerConfig::new("not a url", programs);
        assert!(RpcLedger::new(config, Keypair::new()).is_err());
    }

    #[tokio::test]
    async fn test_write_waits_for_confirmation() {
        let (url, stub, handle) = spawn_ledger(Status::ConfirmAfter(2), HashMap::new()).await;
        let ledger = connect(&url, programs());
        let members = vec![Pubkey::new_unique(), Pubkey::new_unique()];

        let signature = ledger.register_node_group(members, 2).await.unwrap();

        assert_eq!(*stub.polls.lock(), 3);
        let sent = stub.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signatures[0], signature);
        assert_eq!(sent[0].message.account_keys[0], ledger.payer());
        assert!(sent[0].verify().is_ok());

        drop(sent);
        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_failed_status_is_transaction_failed() {
        let (url, _stub, handle) = spawn_ledger(Status::Failed, HashMap::new()).await;
        let ledger = connect(&url, programs());

        let err = ledger
            .register_namespace(vec![Pubkey::new_unique()])
            .await
            .unwrap_err();
        match err {
            LedgerError::TransactionFailed { reason, .. } => {
                assert!(reason.contains("InstructionError"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_unconfirmed_write_times_out() {
        let (url, stub, handle) = spawn_ledger(Status::Unknown, HashMap::new()).await;
        let ledger = connect(&url, programs());

        let err = ledger
            .register_node_group(vec![Pubkey::new_unique()], 1)
            .await
            .unwrap_err();
        let sent = stub.sent.lock()[0].signatures[0];
        assert!(matches!(err, LedgerError::ConfirmationTimeout(s) if s == sent));
        assert!(*stub.polls.lock() > 1);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_node_group_read_decodes_account() {
        let programs = programs();
        let group = NodeGroup::new(vec![Pubkey::new_unique(), Pubkey::new_unique()], 1);
        let key = group.key();
        let (pda, _) = derive_node_group_pda(&key, &programs.storage_manager);

        let mut accounts = HashMap::new();
        accounts.insert(pda.to_string(), encode_account(AccountKind::NodeGroup, &group));
        let (url, _stub, handle) = spawn_ledger(Status::Unknown, accounts).await;
        let ledger = connect(&url, programs);

        assert_eq!(ledger.node_group(&key).await.unwrap(), Some(group));
        assert_eq!(
            ledger.node_group(&NodeGroupKey::new([9u8; 32])).await.unwrap(),
            None
        );

        handle.stop().unwrap();
    }
}
