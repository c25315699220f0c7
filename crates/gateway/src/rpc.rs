//! JSON-RPC 2.0 client over HTTP.
//!
//! One POST per request. The client imposes no timeout of its own.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::protocol::{RpcRequest, RpcResponse};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Node error: code={code}, message={message}")]
    NodeError { code: i64, message: String },
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// HTTP JSON-RPC client for an Ethereum-compatible node.
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a JSON-RPC request and return the result (`Null` when the node
    /// answers with a null result).
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, params, id);

        debug!(id, method, "RPC request");

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus(status.as_u16()));
        }

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        if response.id != id {
            return Err(RpcError::InvalidResponse(format!(
                "response id {} does not match request id {}",
                response.id, id
            )));
        }

        debug!(id, method, "RPC response");

        response.into_result().map_err(|err| RpcError::NodeError {
            code: err.code,
            message: err.message,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &Value) -> Result<u128> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected hex quantity, got {value}")))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidResponse(format!("missing 0x prefix: {text}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| RpcError::InvalidResponse(format!("invalid hex quantity: {text}")))
}

/// Decode `0x`-prefixed hex data.
pub fn parse_data(value: &Value) -> Result<Vec<u8>> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("expected hex data, got {value}")))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::InvalidResponse(format!("missing 0x prefix: {text}")))?;
    hex::decode(digits).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}

/// Format a quantity the way nodes expect (no leading zeros).
pub fn quantity(value: u128) -> String {
    format!("0x{value:x}")
}

/// Format raw bytes as `0x` hex data.
pub fn data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
