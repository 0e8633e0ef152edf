//! Node attestation RPC
//!
//! Each broadcast node exposes `mta_sendDAByParams` over HTTP JSON-RPC.
//! Positional params: sender, index, length, commitment, data, node group
//! key, proof, claimed value, expiry. Byte fields travel as base64 and keys
//! as base58; the result is the base64 signature. A maximum-size blob
//! encodes to about 7 MB, inside the client's default 10 MiB request limit.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use jsonrpsee::{
    core::{client::ClientT, ClientError},
    http_client::HttpClientBuilder,
    rpc_params,
};
use std::time::Duration;

use crate::error::NodeAttestationError;
use crate::request::AttestationRequest;

/// RPC method served by broadcast nodes
pub const ATTESTATION_METHOD: &str = "mta_sendDAByParams";

/// Sends one attestation request to one node
#[async_trait]
pub trait AttestationTransport: Send + Sync {
    async fn request_signature(
        &self,
        url: &str,
        request: &AttestationRequest,
    ) -> Result<Vec<u8>, NodeAttestationError>;
}

/// HTTP JSON-RPC transport
pub struct JsonRpcTransport {
    request_timeout: Duration,
}

impl JsonRpcTransport {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for JsonRpcTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl AttestationTransport for JsonRpcTransport {
    async fn request_signature(
        &self,
        url: &str,
        request: &AttestationRequest,
    ) -> Result<Vec<u8>, NodeAttestationError> {
        let client = HttpClientBuilder::default()
            .request_timeout(self.request_timeout)
            .build(url)
            .map_err(map_client_error)?;

        let params = rpc_params![
            request.sender.to_string(),
            request.index,
            request.length(),
            BASE64.encode(request.commitment.to_bytes()),
            BASE64.encode(&request.data),
            request.node_group_key.to_string(),
            BASE64.encode(request.proof.witness.to_bytes()),
            BASE64.encode(request.proof.claimed_value),
            request.expiry
        ];

        let encoded: String = client
            .request(ATTESTATION_METHOD, params)
            .await
            .map_err(map_client_error)?;

        let signature = BASE64
            .decode(encoded.trim())
            .map_err(|e| NodeAttestationError::Malformed(e.to_string()))?;
        if signature.is_empty() {
            return Err(NodeAttestationError::Malformed("empty signature".to_string()));
        }
        Ok(signature)
    }
}

fn map_client_error(err: ClientError) -> NodeAttestationError {
    match err {
        ClientError::RequestTimeout => NodeAttestationError::Timeout,
        ClientError::Call(call) => NodeAttestationError::Refused(call.message().to_string()),
        ClientError::ParseError(e) => NodeAttestationError::Malformed(e.to_string()),
        other => NodeAttestationError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_types::{Commitment, NodeGroupKey, OpeningProof, MAX_BLOB_SIZE};
    use jsonrpsee::server::{RpcModule, Server, ServerHandle};
    use jsonrpsee::types::ErrorObjectOwned;
    use solana_sdk::pubkey::Pubkey;

    type WireParams = (String, u64, u64, String, String, String, String, String, i64);

    fn request(data: Vec<u8>) -> AttestationRequest {
        AttestationRequest {
            sender: Pubkey::new_unique(),
            index: 3,
            node_group_key: NodeGroupKey::new([4u8; 32]),
            commitment: Commitment {
                x: [1u8; 32],
                y: [2u8; 32],
            },
            proof: OpeningProof::default(),
            expiry: 1_900_000_000,
            data,
        }
    }

    /// Serve the attestation method; signs with the payload length repeated
    async fn spawn_node(delay: Duration, refuse: bool) -> (String, ServerHandle) {
        let server = Server::builder().build("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let mut module = RpcModule::new(());
        module
            .register_async_method(ATTESTATION_METHOD, move |params, _ctx, _ext| async move {
                tokio::time::sleep(delay).await;
                let (_, _, length, commitment, data, _, _, _, _): WireParams = params.parse()?;
                if refuse {
                    return Err(ErrorObjectOwned::owned(-32000, "bad proof", None::<()>));
                }
                let commitment = BASE64.decode(commitment).unwrap_or_default();
                let data = BASE64.decode(data).unwrap_or_default();
                if commitment.len() != 64 || data.len() as u64 != length {
                    return Err(ErrorObjectOwned::owned(-32602, "bad params", None::<()>));
                }
                Ok::<_, ErrorObjectOwned>(BASE64.encode(vec![length as u8; 65]))
            })
            .unwrap();

        let handle = server.start(module);
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_signature_roundtrip() {
        let (url, handle) = spawn_node(Duration::ZERO, false).await;
        let transport = JsonRpcTransport::new(Duration::from_secs(5));

        let signature = transport
            .request_signature(&url, &request(vec![0xAB; 12]))
            .await
            .unwrap();
        assert_eq!(signature, vec![12u8; 65]);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_max_size_blob_fits_one_request() {
        let (url, handle) = spawn_node(Duration::ZERO, false).await;
        let transport = JsonRpcTransport::new(Duration::from_secs(30));

        let signature = transport
            .request_signature(&url, &request(vec![0x5A; MAX_BLOB_SIZE]))
            .await
            .unwrap();
        assert_eq!(signature, vec![MAX_BLOB_SIZE as u8; 65]);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_slow_node_times_out() {
        let (url, handle) = spawn_node(Duration::from_secs(5), false).await;
        let transport = JsonRpcTransport::new(Duration::from_millis(100));

        let err = transport
            .request_signature(&url, &request(vec![1; 4]))
            .await
            .unwrap_err();
        assert_eq!(err, NodeAttestationError::Timeout);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_refusal_is_reported() {
        let (url, handle) = spawn_node(Duration::ZERO, true).await;
        let transport = JsonRpcTransport::default();

        let err = transport
            .request_signature(&url, &request(vec![1; 4]))
            .await
            .unwrap_err();
        assert_eq!(err, NodeAttestationError::Refused("bad proof".to_string()));

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let transport = JsonRpcTransport::new(Duration::from_secs(2));
        let err = transport
            .request_signature("http://127.0.0.1:1", &request(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeAttestationError::Transport(_)));
    }
}
