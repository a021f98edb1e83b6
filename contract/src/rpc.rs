//! Ethereum JSON-RPC transport and the production [`VotingContract`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chainvote_types::{Candidate, CandidateId, ChainId, TxHash, VoterAddress, VoterStatus, Wei};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::abi::{self, selector};
use crate::client::{ChainProvider, EventBatch, LoggedEvent, TxReceipt, VotingContract};
use crate::{ContractError, ContractEvent};

/// HTTP client for an Ethereum node's JSON-RPC endpoint.
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl JsonRpcClient {
    /// Create a client for the node at `url` (e.g. `http://127.0.0.1:8545`).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ContractError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ContractError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a request and deserialize its `result`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ContractError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContractError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ContractError::Transport(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ContractError::Decode(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(classify_rpc_error(err));
        }

        serde_json::from_value(parsed.result.unwrap_or(Value::Null))
            .map_err(|e| ContractError::Decode(format!("unexpected {method} result: {e}")))
    }
}

/// Turn a JSON-RPC error into a revert when the node reports one.
///
/// Nodes report reverts either with an `Error(string)` payload in `data` or
/// with a message of the form `execution reverted: <reason>`.
fn classify_rpc_error(err: RpcErrorObject) -> ContractError {
    if let Some(reason) = err
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|d| abi::from_hex_data(d).ok())
        .and_then(|bytes| abi::decode_revert(&bytes))
    {
        return ContractError::Revert { reason };
    }
    if let Some(rest) = err.message.strip_prefix("execution reverted") {
        let reason = rest.trim_start_matches(':').trim().to_string();
        return ContractError::Revert { reason };
    }
    // Some nodes embed the reason mid-message (e.g. "VM Exception ... revert Only admin").
    if let Some(idx) = err.message.find("revert ") {
        let reason = err.message[idx + "revert ".len()..].trim().to_string();
        return ContractError::Revert { reason };
    }
    ContractError::Rpc {
        code: err.code,
        message: err.message,
    }
}

#[async_trait]
impl ChainProvider for JsonRpcClient {
    async fn chain_id(&self) -> Result<ChainId, ContractError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        ChainId::from_hex(&raw).map_err(|e| ContractError::Decode(e.to_string()))
    }

    async fn balance(&self, address: &VoterAddress) -> Result<Wei, ContractError> {
        let raw: String = self
            .request("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Wei::from_hex_quantity(&raw).map_err(|e| ContractError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<String>,
}

/// Receipt polling parameters for write calls.
#[derive(Clone, Copy, Debug)]
pub struct ReceiptPolling {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReceiptPolling {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

/// Largest block range asked of `eth_getLogs` by default. Hosted nodes
/// refuse wider ranges.
pub const DEFAULT_LOG_WINDOW: u64 = 2_000;

/// [`VotingContract`] backed by a deployed contract reached over JSON-RPC.
///
/// Writes go through `eth_sendTransaction`, so the node must manage (and have
/// unlocked) the sending accounts.
pub struct RpcVotingContract {
    rpc: JsonRpcClient,
    address: VoterAddress,
    polling: ReceiptPolling,
    log_window: u64,
}

impl RpcVotingContract {
    pub fn new(rpc: JsonRpcClient, address: VoterAddress, polling: ReceiptPolling) -> Self {
        Self {
            rpc,
            address,
            polling,
            log_window: DEFAULT_LOG_WINDOW,
        }
    }

    /// Fetch at most `blocks` blocks of logs per `events` call (minimum 1).
    pub fn with_log_window(mut self, blocks: u64) -> Self {
        self.log_window = blocks.max(1);
        self
    }

    pub fn address(&self) -> &VoterAddress {
        &self.address
    }

    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        let raw: String = self
            .rpc
            .request(
                "eth_call",
                json!([
                    { "to": self.address.as_str(), "data": abi::to_hex_data(&data) },
                    "latest"
                ]),
            )
            .await?;
        abi::from_hex_data(&raw)
    }

    async fn send(&self, from: &VoterAddress, data: Vec<u8>) -> Result<TxReceipt, ContractError> {
        let raw_hash: String = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from.as_str(),
                    "to": self.address.as_str(),
                    "data": abi::to_hex_data(&data),
                }]),
            )
            .await?;
        let tx_hash: TxHash = raw_hash
            .parse()
            .map_err(|e: chainvote_types::TypesError| ContractError::Decode(e.to_string()))?;
        tracing::debug!(%tx_hash, from = %from, "transaction submitted");
        self.wait_for_receipt(tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ContractError> {
        for attempt in 0..self.polling.attempts {
            let receipt: Option<RawReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await?;
            if let Some(receipt) = receipt {
                if receipt.status.as_deref() == Some("0x0") {
                    return Err(ContractError::TransactionFailed(tx_hash));
                }
                let block_number = match receipt.block_number.as_deref() {
                    Some(b) => abi::parse_quantity(b)?,
                    None => 0,
                };
                let gas_used = match receipt.gas_used.as_deref() {
                    Some(g) => abi::parse_quantity(g)?,
                    None => 0,
                };
                tracing::debug!(%tx_hash, block_number, attempt, "transaction mined");
                return Ok(TxReceipt {
                    tx_hash,
                    block_number,
                    gas_used,
                });
            }
            tokio::time::sleep(self.polling.interval).await;
        }
        Err(ContractError::Timeout(tx_hash, self.polling.attempts))
    }
}

#[async_trait]
impl VotingContract for RpcVotingContract {
    async fn voting_active(&self) -> Result<bool, ContractError> {
        let out = self.call(abi::call(selector::VOTING_ACTIVE)).await?;
        abi::decode_bool(&out, 0)
    }

    async fn total_candidates(&self) -> Result<u64, ContractError> {
        let out = self.call(abi::call(selector::TOTAL_CANDIDATES)).await?;
        abi::decode_uint(&out, 0)
    }

    async fn total_votes(&self) -> Result<u64, ContractError> {
        let out = self.call(abi::call(selector::TOTAL_VOTES)).await?;
        abi::decode_uint(&out, 0)
    }

    async fn admin(&self) -> Result<VoterAddress, ContractError> {
        let out = self.call(abi::call(selector::ADMIN)).await?;
        abi::decode_address(&out, 0)
    }

    async fn candidate(&self, id: CandidateId) -> Result<Candidate, ContractError> {
        let out = self
            .call(abi::call_uint(selector::CANDIDATES, id.value()))
            .await?;
        Ok(Candidate {
            id: CandidateId::new(abi::decode_uint(&out, 0)?),
            name: abi::decode_string(&out, 1)?,
            vote_count: abi::decode_uint(&out, 2)?,
        })
    }

    async fn voter(&self, address: &VoterAddress) -> Result<VoterStatus, ContractError> {
        let out = self
            .call(abi::call_address(selector::VOTERS, address))
            .await?;
        Ok(VoterStatus {
            is_registered: abi::decode_bool(&out, 0)?,
            has_voted: abi::decode_bool(&out, 1)?,
        })
    }

    async fn vote(&self, from: &VoterAddress, id: CandidateId) -> Result<TxReceipt, ContractError> {
        self.send(from, abi::call_uint(selector::VOTE, id.value()))
            .await
    }

    async fn add_candidate(
        &self,
        from: &VoterAddress,
        name: &str,
    ) -> Result<TxReceipt, ContractError> {
        self.send(from, abi::call_string(selector::ADD_CANDIDATE, name))
            .await
    }

    async fn register_voter(
        &self,
        from: &VoterAddress,
        voter: &VoterAddress,
    ) -> Result<TxReceipt, ContractError> {
        self.send(from, abi::call_address(selector::REGISTER_VOTER, voter))
            .await
    }

    async fn start_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError> {
        self.send(from, abi::call(selector::START_VOTING)).await
    }

    async fn end_voting(&self, from: &VoterAddress) -> Result<TxReceipt, ContractError> {
        self.send(from, abi::call(selector::END_VOTING)).await
    }

    async fn events(&self, from_block: u64) -> Result<EventBatch, ContractError> {
        let head_raw: String = self.rpc.request("eth_blockNumber", json!([])).await?;
        let head = abi::parse_quantity(&head_raw)?;
        if from_block > head {
            return Ok(EventBatch {
                events: Vec::new(),
                next_block: from_block,
            });
        }
        let to_block = head.min(from_block.saturating_add(self.log_window - 1));

        let logs: Vec<RawLog> = self
            .rpc
            .request(
                "eth_getLogs",
                json!([{
                    "address": self.address.as_str(),
                    "fromBlock": abi::quantity(from_block),
                    "toBlock": abi::quantity(to_block),
                }]),
            )
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match decode_log(&log, to_block) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => tracing::warn!(
                    tx = log.transaction_hash.as_deref().unwrap_or("-"),
                    error = %e,
                    "skipping undecodable contract log"
                ),
            }
        }

        Ok(EventBatch {
            events,
            next_block: to_block + 1,
        })
    }
}

/// `None` for logs with a signature this contract does not emit.
fn decode_log(log: &RawLog, default_block: u64) -> Result<Option<LoggedEvent>, ContractError> {
    let data = abi::from_hex_data(&log.data)?;
    let Some(event) = ContractEvent::decode(&log.topics, &data)? else {
        return Ok(None);
    };
    let block_number = match log.block_number.as_deref() {
        Some(b) => abi::parse_quantity(b)?,
        None => default_block,
    };
    Ok(Some(LoggedEvent {
        block_number,
        tx_hash: log.transaction_hash.as_deref().and_then(|h| h.parse().ok()),
        event,
    }))
}
