//! JSON-RPC client for the consensus engine's WebSocket endpoint

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};

use consensus_core::block::{Block, BlockInfo};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::notify::{ConsensusEvent, VirtualChainChanges};
use consensus_core::Hash;

use crate::api::{NotificationApi, RpcApi};
use crate::model::*;

const BLOCK_ADDED_NOTIFICATION: &str = "blockAddedNotification";
const VIRTUAL_CHAIN_CHANGED_NOTIFICATION: &str = "virtualChainChangedNotification";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: serde_json::Value,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl From<JsonRpcError> for RpcError {
    fn from(error: JsonRpcError) -> Self {
        if error.code == NOT_FOUND_ERROR_CODE {
            RpcError::NotFound(error.message)
        } else {
            RpcError::Rpc { code: error.code, message: error.message }
        }
    }
}

pub struct RpcClient {
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(RpcError::Internal(format!("Unsupported RPC url scheme: {}", url)));
        }
        Ok(Self { url: url.to_string(), next_id: AtomicU64::new(1) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, method: &str, params: serde_json::Value) -> Result<(u64, String), RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest { jsonrpc: "2.0", id, method, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RpcError::Internal(format!("Request serialization failed: {}", e)))?;
        Ok((id, request_json))
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| RpcError::Network(format!("WebSocket connection failed: {}", e)))?;

        let (mut write, mut read) = ws_stream.split();
        let (id, request_json) = self.request(method, params)?;

        write.send(Message::Text(request_json)).await.map_err(|e| RpcError::Network(format!("Send failed: {}", e)))?;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let response: JsonRpcMessage = serde_json::from_str(&text)
                        .map_err(|e| RpcError::Internal(format!("Response parsing failed: {}", e)))?;

                    if response.id != Some(id) {
                        continue; // Not our response
                    }

                    if let Some(error) = response.error {
                        return Err(error.into());
                    }

                    return Ok(response.result);
                }
                Ok(Message::Close(_)) => break,
                Err(e) => return Err(RpcError::Network(format!("WebSocket error: {}", e))),
                _ => continue,
            }
        }

        Err(RpcError::Network("Connection closed without response".to_string()))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> RpcResult<T> {
        let result = self.call_method(method, params).await?;
        serde_json::from_value(result).map_err(|e| RpcError::Internal(format!("Deserialization error in {}: {}", method, e)))
    }
}

/// Turns an engine notification into a consensus event
fn decode_notification(method: &str, params: serde_json::Value) -> Result<ConsensusEvent, RpcError> {
    let decode_error = |e: serde_json::Error| RpcError::Internal(format!("Malformed {}: {}", method, e));
    match method {
        BLOCK_ADDED_NOTIFICATION => {
            let notification: BlockAddedNotification = serde_json::from_value(params).map_err(decode_error)?;
            Ok(ConsensusEvent::BlockAdded(notification.block))
        }
        VIRTUAL_CHAIN_CHANGED_NOTIFICATION => {
            let changes: VirtualChainChanges = serde_json::from_value(params).map_err(decode_error)?;
            Ok(ConsensusEvent::VirtualChange(changes))
        }
        other => Ok(ConsensusEvent::Unsupported(other.to_string())),
    }
}

/// Relays engine notifications until the stream ends.
///
/// A failure is forwarded as a final `StreamError` event so the consumer can
/// tell it apart from an orderly close.
async fn forward_notifications<S>(mut read: S, sender: UnboundedSender<ConsensusEvent>)
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let event = match next_event(message) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(StreamEnd::Closed) => break,
            Err(StreamEnd::Failed(reason)) => {
                error!("{}", reason);
                let _ = sender.send(ConsensusEvent::StreamError(reason));
                break;
            }
        };
        if sender.send(event).is_err() {
            warn!("Notification receiver dropped, stopping notification stream");
            break;
        }
    }
    debug!("Notification stream closed");
}

enum StreamEnd {
    Closed,
    Failed(String),
}

fn next_event(message: Result<Message, tokio_tungstenite::tungstenite::Error>) -> Result<Option<ConsensusEvent>, StreamEnd> {
    let text = match message {
        Ok(Message::Text(text)) => text,
        Ok(Message::Close(_)) => return Err(StreamEnd::Closed),
        Err(e) => return Err(StreamEnd::Failed(format!("Notification stream error: {}", e))),
        _ => return Ok(None),
    };
    let message: JsonRpcMessage =
        serde_json::from_str(&text).map_err(|e| StreamEnd::Failed(format!("Could not parse notification: {}", e)))?;
    if let Some(error) = message.error {
        return Err(StreamEnd::Failed(format!("Subscription request {:?} failed: {}", message.id, RpcError::from(error))));
    }
    let Some(method) = message.method else {
        debug!("Subscription request {:?} acknowledged", message.id);
        return Ok(None);
    };
    decode_notification(&method, message.params).map(Some).map_err(|e| StreamEnd::Failed(e.to_string()))
}

#[async_trait]
impl RpcApi for RpcClient {
    async fn get_server_info(&self) -> RpcResult<ServerInfo> {
        self.call("getServerInfo", serde_json::json!([])).await
    }

    async fn get_pruning_point(&self) -> RpcResult<Hash> {
        self.call("getPruningPoint", serde_json::json!([])).await
    }

    async fn get_headers_selected_tip(&self) -> RpcResult<Hash> {
        self.call("getHeadersSelectedTip", serde_json::json!([])).await
    }

    async fn get_hashes_between(&self, low: Hash, high: Hash, max_blocks: u64) -> RpcResult<Vec<Hash>> {
        let params = serde_json::json!({ "lowHash": low, "highHash": high, "maxBlocks": max_blocks });
        self.call("getHashesBetween", params).await
    }

    async fn get_virtual_selected_parent_chain_from_block(&self, start: Hash) -> RpcResult<VirtualChainChanges> {
        self.call("getVirtualSelectedParentChainFromBlock", serde_json::json!([start])).await
    }

    async fn get_block(&self, hash: Hash) -> RpcResult<Block> {
        self.call("getBlock", serde_json::json!([hash])).await
    }

    async fn get_block_even_if_header_only(&self, hash: Hash) -> RpcResult<Block> {
        self.call("getBlockEvenIfHeaderOnly", serde_json::json!([hash])).await
    }

    async fn get_block_header(&self, hash: Hash) -> RpcResult<Header> {
        self.call("getBlockHeader", serde_json::json!([hash])).await
    }

    async fn get_block_info(&self, hash: Hash) -> RpcResult<BlockInfo> {
        self.call("getBlockInfo", serde_json::json!([hash])).await
    }

    async fn get_block_ghostdag_data(&self, hash: Hash) -> RpcResult<GhostdagData> {
        self.call("getBlockGhostdagData", serde_json::json!([hash])).await
    }
}

#[async_trait]
impl NotificationApi for RpcClient {
    async fn start_notify(&self) -> RpcResult<UnboundedReceiver<ConsensusEvent>> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| RpcError::Network(format!("WebSocket connection failed: {}", e)))?;
        let (mut write, read) = ws_stream.split();

        for method in ["notifyBlockAdded", "notifyVirtualChainChanged"] {
            let (_, request_json) = self.request(method, serde_json::json!([]))?;
            write.send(Message::Text(request_json)).await.map_err(|e| RpcError::Network(format!("Send failed: {}", e)))?;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            // Keep the write half alive for as long as notifications flow
            let _write = write;
            forward_notifications(read, sender).await;
        });
        Ok(receiver)
    }
}
