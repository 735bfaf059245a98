//! Chain transport
//!
//! [`ChainTransport`] is everything the relayer needs from a node. The live
//! implementation speaks JSON-RPC over HTTP; [`super::paper::PaperChain`]
//! implements it in memory.
//!
//! Transport failures (unreachable node, timeout, malformed response) are
//! `Err`. A node that answers with a JSON-RPC error for `eth_call` or
//! `eth_sendRawTransaction` is a normal outcome and is returned as a value,
//! since that is how reverts and rejections arrive.

use alloy::primitives::{Address, Bytes, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Read-only call used for pre-flight simulation.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub gas: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success(Bytes),
    Reverted { message: String, data: Bytes },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted(B256),
    /// Node refused the transaction (nonce, funds, or a revert on admission).
    Rejected { message: String, data: Bytes },
}

/// Current network fee inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeData {
    pub gas_price: u128,
    /// `None` on chains without EIP-1559.
    pub base_fee_per_gas: Option<u128>,
    /// `None` when `eth_maxPriorityFeePerGas` is unsupported or unreachable.
    pub max_priority_fee_per_gas: Option<u128>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait ChainTransport: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// `eth_getTransactionCount(address, "pending")`
    async fn pending_nonce(&self, address: Address) -> Result<u64>;

    async fn fee_data(&self) -> Result<FeeData>;

    async fn call(&self, request: &CallRequest) -> Result<CallOutcome>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<SendOutcome>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;

    fn name(&self) -> &'static str;
}

// =============================================================================
// JSON-RPC
// =============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Revert payload, either `data: "0x.."` or `data: {"data": "0x.."}`.
    pub fn revert_data(&self) -> Bytes {
        let raw = match &self.data {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(obj)) => obj.get("data").and_then(Value::as_str),
            _ => None,
        };
        raw.and_then(|s| parse_hex_bytes(s).ok()).unwrap_or_default()
    }
}

pub struct JsonRpcTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build RPC client")?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Outer `Err` is transport failure; inner `Err` is a JSON-RPC error object.
    async fn request(
        &self,
        method: &str,
        params: Value,
    ) -> Result<std::result::Result<Value, JsonRpcError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("{} returned HTTP {}", method, resp.status()));
        }

        let body: JsonRpcResponse = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {} response", method))?;
        debug!(method, id, ok = body.error.is_none(), "RPC response");

        if let Some(err) = body.error {
            return Ok(Err(err));
        }
        Ok(Ok(body.result.unwrap_or(Value::Null)))
    }

    /// Request where a JSON-RPC error is treated as a failure.
    async fn request_ok(&self, method: &str, params: Value) -> Result<Value> {
        self.request(method, params).await?.map_err(|err| {
            anyhow::anyhow!("rpc returned error for {}: {} ({})", method, err.message, err.code)
        })
    }

    async fn request_str(&self, method: &str, params: Value) -> Result<String> {
        let value = self.request_ok(method, params).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("{} result was missing", method))
    }
}

#[async_trait]
impl ChainTransport for JsonRpcTransport {
    async fn chain_id(&self) -> Result<u64> {
        let raw = self.request_str("eth_chainId", json!([])).await?;
        parse_hex_u64(&raw, "eth_chainId")
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let raw = self
            .request_str(
                "eth_getTransactionCount",
                json!([format!("{:#x}", address), "pending"]),
            )
            .await?;
        parse_hex_u64(&raw, "eth_getTransactionCount")
    }

    async fn fee_data(&self) -> Result<FeeData> {
        let (gas_price, block) = tokio::try_join!(
            self.request_str("eth_gasPrice", json!([])),
            self.request_ok("eth_getBlockByNumber", json!(["latest", false])),
        )?;

        let base_fee_per_gas = block
            .get("baseFeePerGas")
            .and_then(Value::as_str)
            .map(|raw| parse_hex_u128(raw, "baseFeePerGas"))
            .transpose()?;

        let max_priority_fee_per_gas =
            optional_priority_fee(self.request("eth_maxPriorityFeePerGas", json!([])).await);

        Ok(FeeData {
            gas_price: parse_hex_u128(&gas_price, "eth_gasPrice")?,
            base_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    async fn call(&self, request: &CallRequest) -> Result<CallOutcome> {
        let mut tx = json!({
            "from": format!("{:#x}", request.from),
            "to": format!("{:#x}", request.to),
            "data": format!("0x{}", hex::encode(&request.data)),
        });
        if let Some(gas) = request.gas {
            tx["gas"] = json!(format!("{:#x}", gas));
        }

        match self.request("eth_call", json!([tx, "pending"])).await? {
            Ok(value) => {
                let raw = value.as_str().unwrap_or("0x");
                Ok(CallOutcome::Success(parse_hex_bytes(raw)?))
            }
            Err(err) => Ok(CallOutcome::Reverted {
                data: err.revert_data(),
                message: err.message,
            }),
        }
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<SendOutcome> {
        let params = json!([format!("0x{}", hex::encode(raw))]);
        match self.request("eth_sendRawTransaction", params).await? {
            Ok(Value::String(hash)) => {
                let hash: B256 = hash
                    .parse()
                    .with_context(|| format!("invalid transaction hash {}", hash))?;
                Ok(SendOutcome::Accepted(hash))
            }
            Ok(other) => Err(anyhow::anyhow!(
                "eth_sendRawTransaction returned unexpected result: {}",
                other
            )),
            Err(err) => Ok(SendOutcome::Rejected {
                data: err.revert_data(),
                message: err.message,
            }),
        }
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let value = self
            .request_ok("eth_getTransactionReceipt", json!([format!("{:#x}", hash)]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        parse_receipt(hash, &value).map(Some)
    }

    fn name(&self) -> &'static str {
        "json-rpc"
    }
}

fn parse_receipt(hash: B256, value: &Value) -> Result<TxReceipt> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);

    let success = match field("status") {
        Some(raw) => parse_hex_u64(raw, "status")? == 1,
        None => return Err(anyhow::anyhow!("receipt for {:#x} has no status", hash)),
    };
    let gas_used = field("gasUsed")
        .map(|raw| parse_hex_u64(raw, "gasUsed"))
        .transpose()?
        .unwrap_or(0);
    let block_number = field("blockNumber")
        .map(|raw| parse_hex_u64(raw, "blockNumber"))
        .transpose()?;

    Ok(TxReceipt {
        tx_hash: hash,
        success,
        gas_used,
        block_number,
    })
}

/// `eth_maxPriorityFeePerGas` is optional; any failure means no suggestion.
fn optional_priority_fee(
    response: Result<std::result::Result<Value, JsonRpcError>>,
) -> Option<u128> {
    match response {
        Ok(Ok(Value::String(raw))) => parse_hex_u128(&raw, "eth_maxPriorityFeePerGas")
            .map_err(|e| debug!(error = %e, "Ignoring priority fee suggestion"))
            .ok(),
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
            debug!(code = err.code, message = %err.message, "eth_maxPriorityFeePerGas unsupported");
            None
        }
        Err(e) => {
            debug!(error = %format!("{:#}", e), "eth_maxPriorityFeePerGas unreachable");
            None
        }
    }
}

fn strip_hex_prefix<'a>(raw: &'a str, field: &str) -> Result<&'a str> {
    let value = raw.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| anyhow::anyhow!("{} must be 0x-prefixed hex", field))
}

pub fn parse_hex_u64(raw: &str, field: &str) -> Result<u64> {
    let digits = strip_hex_prefix(raw, field)?;
    u64::from_str_radix(digits, 16)
        .with_context(|| format!("failed to parse {} as hex u64", field))
}

pub fn parse_hex_u128(raw: &str, field: &str) -> Result<u128> {
    let digits = strip_hex_prefix(raw, field)?;
    u128::from_str_radix(digits, 16)
        .with_context(|| format!("failed to parse {} as hex u128", field))
}

pub fn parse_hex_bytes(raw: &str) -> Result<Bytes> {
    let digits = strip_hex_prefix(raw, "data")?;
    Ok(hex::decode(digits).context("invalid hex data")?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_u64("0x10", "n").unwrap(), 16);
        assert_eq!(parse_hex_u128("0x3b9aca00", "gas").unwrap(), 1_000_000_000);
        assert!(parse_hex_u64("10", "n").is_err());
        assert_eq!(parse_hex_bytes("0x").unwrap(), Bytes::new());
    }

    #[test]
    fn revert_data_accepts_both_shapes() {
        let flat: JsonRpcError = serde_json::from_value(json!({
            "code": 3, "message": "execution reverted", "data": "0xdeadbeef"
        }))
        .unwrap();
        assert_eq!(flat.revert_data().as_ref(), &[0xde, 0xad, 0xbe, 0xef]);

        let nested: JsonRpcError = serde_json::from_value(json!({
            "code": -32000, "message": "execution reverted", "data": {"data": "0x01"}
        }))
        .unwrap();
        assert_eq!(nested.revert_data().as_ref(), &[0x01]);

        let none: JsonRpcError =
            serde_json::from_value(json!({"code": -32000, "message": "nonce too low"})).unwrap();
        assert!(none.revert_data().is_empty());
    }

    #[test]
    fn priority_fee_failures_fall_back_to_none() {
        assert_eq!(
            optional_priority_fee(Ok(Ok(json!("0x3b9aca00")))),
            Some(1_000_000_000)
        );
        assert_eq!(
            optional_priority_fee(Err(anyhow::anyhow!("operation timed out"))),
            None
        );
        let unsupported: JsonRpcError =
            serde_json::from_value(json!({"code": -32601, "message": "method not found"}))
                .unwrap();
        assert_eq!(optional_priority_fee(Ok(Err(unsupported))), None);
        assert_eq!(optional_priority_fee(Ok(Ok(json!("garbage")))), None);
        assert_eq!(optional_priority_fee(Ok(Ok(Value::Null))), None);
    }

    #[test]
    fn receipt_status_zero_is_failure() {
        let hash = B256::repeat_byte(0xab);
        let receipt = parse_receipt(
            hash,
            &json!({"status": "0x0", "gasUsed": "0x5208", "blockNumber": "0x2a"}),
        )
        .unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.block_number, Some(42));
        assert!(parse_receipt(hash, &json!({})).is_err());
    }
}
