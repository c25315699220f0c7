//! Ledger gateway for an EVM contract reached over JSON-RPC.
//!
//! Reads are `eth_call`s. Mutations are legacy EIP-155 transactions signed
//! locally and sent with `eth_sendRawTransaction`; finality is a receipt
//! with a block number, polled until the confirmation timeout.

use std::time::Duration;

use lootledger_core::{Address, LootRecord, Participant, Round};
use lootledger_crypto::{LegacyTransaction, SigningKeypair};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::abi;
use crate::rpc::{self, parse_data, parse_quantity, RpcClient, RpcError};
use crate::{GatewayError, LedgerGateway, RawArtifact, Result, TxHandle, TxReceipt};

pub struct EvmGateway {
    rpc: RpcClient,
    contract: Option<Address>,
    signer: Option<SigningKeypair>,
    /// Used when `eth_estimateGas` fails for a reason other than a revert.
    gas_limit: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EvmGateway {
    pub fn new(rpc_url: &str, contract: Option<Address>) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url),
            contract,
            signer: None,
            gas_limit: 500_000,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_signer(mut self, signer: Option<SigningKeypair>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn contract(&self) -> Result<Address> {
        self.contract.ok_or(GatewayError::MissingContract)
    }

    /// `eth_call` against the contract at the latest block.
    async fn call(&self, data: Vec<u8>, from: Option<Address>) -> Result<Vec<u8>> {
        let mut call = json!({
            "to": self.contract()?.to_string(),
            "data": rpc::data(&data),
        });
        if let Some(from) = from {
            call["from"] = json!(from.to_string());
        }
        let result = self.rpc.request("eth_call", json!([call, "latest"])).await?;
        Ok(parse_data(&result)?)
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128> {
        let result = self.rpc.request(method, params).await?;
        Ok(parse_quantity(&result)?)
    }

    async fn estimate_gas(&self, from: Address, to: Address, data: &[u8]) -> Result<u64> {
        let call = json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "data": rpc::data(data),
        });
        match self.quantity("eth_estimateGas", json!([call])).await {
            Ok(gas) => Ok(u64::try_from(gas).unwrap_or(self.gas_limit)),
            Err(GatewayError::Rpc(RpcError::NodeError { message, .. }))
                if message.to_lowercase().contains("revert") =>
            {
                Err(GatewayError::Rejected(message))
            }
            Err(e) => {
                warn!(error = %e, fallback = self.gas_limit, "Gas estimation failed");
                Ok(self.gas_limit)
            }
        }
    }

    /// Sign and send a contract call; returns once the node accepts it.
    async fn send(&self, data: Vec<u8>, action: &str) -> Result<TxHandle> {
        let signer = self.signer.as_ref().ok_or(GatewayError::MissingCredential)?;
        let to = self.contract()?;
        let from = signer.address();

        let chain_id = self.quantity("eth_chainId", json!([])).await?;
        let nonce = self
            .quantity("eth_getTransactionCount", json!([from.to_string(), "pending"]))
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
        let gas_limit = self.estimate_gas(from, to, &data).await?;

        let tx = LegacyTransaction {
            nonce: u64::try_from(nonce)
                .map_err(|_| RpcError::InvalidResponse(format!("nonce out of range: {nonce}")))?,
            gas_price,
            gas_limit,
            to,
            value: 0,
            data,
            chain_id: u64::try_from(chain_id)
                .map_err(|_| RpcError::InvalidResponse(format!("chain id out of range: {chain_id}")))?,
        };
        let signed = tx.sign(signer)?;

        let result = self
            .rpc
            .request("eth_sendRawTransaction", json!([signed.raw_hex()]))
            .await
            .map_err(|e| match e {
                RpcError::NodeError { message, .. } => GatewayError::Rejected(message),
                other => GatewayError::Rpc(other),
            })?;
        let hash = result
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| signed.hash_hex());

        info!(tx = %hash, from = %from, nonce = tx.nonce, "{action} submitted");
        Ok(TxHandle { hash })
    }
}

#[async_trait::async_trait]
impl LedgerGateway for EvmGateway {
    async fn get_round(&self) -> Result<Round> {
        let data = self.call(abi::round_call(), None).await?;
        Ok(abi::decode_round(&data)?)
    }

    async fn get_outstanding_participants(&self) -> Result<Vec<Participant>> {
        let data = self
            .call(abi::pirates_yet_to_report_call(), None)
            .await?;
        Ok(abi::decode_participants(&data)?)
    }

    async fn record_haul(&self, participant: Address, amount: u128) -> Result<TxHandle> {
        self.send(abi::record_haul_call(participant, amount), "recordHaul")
            .await
    }

    async fn advance_round(&self) -> Result<TxHandle> {
        self.send(abi::hoist_the_colors_call(), "hoistTheColors")
            .await
    }

    async fn wait_for_finality(&self, tx: &TxHandle) -> Result<TxReceipt> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let receipt = match self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx.hash]))
                .await
            {
                Ok(receipt) => receipt,
                // The transaction may still land; keep polling until the deadline.
                Err(e @ (RpcError::ConnectionFailed(_) | RpcError::HttpStatus(_))) => {
                    warn!(tx = %tx, error = %e, "Receipt poll failed");
                    Value::Null
                }
                Err(e) => return Err(e.into()),
            };

            let block_number = match receipt.get("blockNumber") {
                Some(v) if !v.is_null() => Some(parse_quantity(v)?),
                _ => None,
            };
            if let Some(block) = block_number {
                let status = match receipt.get("status") {
                    Some(v) if !v.is_null() => Some(parse_quantity(v)?),
                    _ => None,
                };
                if status == Some(0) {
                    warn!(tx = %tx, block, "Transaction reverted");
                    return Err(GatewayError::Reverted(tx.hash.clone()));
                }
                info!(tx = %tx, block, "Transaction confirmed");
                return Ok(TxReceipt {
                    hash: tx.hash.clone(),
                    block_number: u64::try_from(block).ok(),
                });
            }

            if Instant::now() >= deadline {
                return Err(GatewayError::Timeout {
                    hash: tx.hash.clone(),
                    secs: self.confirmation_timeout.as_secs(),
                });
            }
            debug!(tx = %tx, "Awaiting receipt");
            sleep(self.poll_interval).await;
        }
    }

    async fn generate_chart_artifact(&self) -> Result<RawArtifact> {
        let from = self.signer.as_ref().map(SigningKeypair::address);
        let data = self
            .call(abi::generate_chart_call(), from)
            .await?;
        Ok(RawArtifact::Bytes(abi::decode_chart(&data)?))
    }

    async fn get_loot_totals(&self) -> Result<Vec<LootRecord>> {
        let data = self
            .call(abi::get_loot_totals_call(), None)
            .await?;
        Ok(abi::decode_loot_totals(&data)?)
    }

    fn signer(&self) -> Option<Address> {
        self.signer.as_ref().map(SigningKeypair::address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use alloy_sol_types::SolValue;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    fn contract() -> Address {
        "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap()
    }

    /// Canned answer of the local node.
    enum Reply {
        Result(Value),
        Error(i64, &'static str),
        Status(u16),
    }

    type Handler = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

    /// Local JSON-RPC node answering every request through `handler`.
    /// Returns its URL and the log of methods it was asked for.
    async fn local_node(
        handler: impl Fn(&str) -> Reply + Send + Sync + 'static,
    ) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let log = calls.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, handler.clone(), log.clone()));
            }
        });
        (url, calls)
    }

    async fn serve(stream: TcpStream, handler: Handler, calls: Arc<Mutex<Vec<String>>>) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let mut content_length = 0usize;
            loop {
                line.clear();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                let header = line.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).await.unwrap();

            let request: Value = serde_json::from_slice(&body).unwrap();
            let method = request["method"].as_str().unwrap().to_string();
            calls.lock().unwrap().push(method.clone());

            let body = match handler(&method) {
                Reply::Result(result) => {
                    json!({"jsonrpc": "2.0", "id": request["id"], "result": result})
                }
                Reply::Error(code, message) => json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": {"code": code, "message": message},
                }),
                Reply::Status(code) => {
                    let response = format!("HTTP/1.1 {code} Unavailable\r\ncontent-length: 0\r\n\r\n");
                    if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                    continue;
                }
            }
            .to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    fn fast(gateway: EvmGateway) -> EvmGateway {
        gateway
            .with_poll_interval(Duration::from_millis(5))
            .with_confirmation_timeout(Duration::from_millis(200))
    }

    fn handle() -> TxHandle {
        TxHandle::new(format!("0x{}", "ab".repeat(32)))
    }

    fn chain_reply(method: &str) -> Option<Reply> {
        match method {
            "eth_chainId" => Some(Reply::Result(json!("0x7a69"))),
            "eth_getTransactionCount" => Some(Reply::Result(json!("0x3"))),
            "eth_gasPrice" => Some(Reply::Result(json!("0x3b9aca00"))),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_confirmed_receipt() {
        let (url, _) = local_node(|_| {
            Reply::Result(json!({"blockNumber": "0x10", "status": "0x1"}))
        })
        .await;
        let gateway = fast(EvmGateway::new(&url, Some(contract())));

        let receipt = gateway.wait_for_finality(&handle()).await.unwrap();
        assert_eq!(receipt.hash, handle().hash);
        assert_eq!(receipt.block_number, Some(16));
    }

    #[tokio::test]
    async fn test_status_zero_is_reverted() {
        let (url, _) = local_node(|_| {
            Reply::Result(json!({"blockNumber": "0x10", "status": "0x0"}))
        })
        .await;
        let gateway = fast(EvmGateway::new(&url, Some(contract())));

        assert!(matches!(
            gateway.wait_for_finality(&handle()).await,
            Err(GatewayError::Reverted(hash)) if hash == handle().hash
        ));
    }

    #[tokio::test]
    async fn test_missing_receipt_times_out() {
        let (url, calls) = local_node(|_| Reply::Result(Value::Null)).await;
        let gateway = EvmGateway::new(&url, Some(contract()))
            .with_poll_interval(Duration::from_millis(5))
            .with_confirmation_timeout(Duration::from_millis(50));

        assert!(matches!(
            gateway.wait_for_finality(&handle()).await,
            Err(GatewayError::Timeout { .. })
        ));
        assert!(calls.lock().unwrap().len() > 1);
    }

    #[tokio::test]
    async fn test_transient_poll_failures_keep_waiting() {
        let polls = AtomicUsize::new(0);
        let (url, calls) = local_node(move |_| match polls.fetch_add(1, Ordering::SeqCst) {
            0 => Reply::Status(503),
            1 => Reply::Result(Value::Null),
            _ => Reply::Result(json!({"blockNumber": "0x2", "status": "0x1"})),
        })
        .await;
        let gateway = fast(EvmGateway::new(&url, Some(contract())));

        let receipt = gateway.wait_for_finality(&handle()).await.unwrap();
        assert_eq!(receipt.block_number, Some(2));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_node_error_while_polling_is_terminal() {
        let (url, _) = local_node(|_| Reply::Error(-32602, "invalid params")).await;
        let gateway = fast(EvmGateway::new(&url, Some(contract())));

        assert!(matches!(
            gateway.wait_for_finality(&handle()).await,
            Err(GatewayError::Rpc(RpcError::NodeError { code: -32602, .. }))
        ));
    }

    #[tokio::test]
    async fn test_estimate_revert_is_rejected_before_signing() {
        let (url, calls) = local_node(|method| {
            chain_reply(method).unwrap_or(Reply::Error(3, "execution reverted: already reported"))
        })
        .await;
        let gateway = EvmGateway::new(&url, Some(contract()))
            .with_signer(Some(SigningKeypair::generate()));

        let err = gateway.record_haul(Address([0xa1; 20]), 1).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(ref m) if m.contains("already reported")));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.last().map(String::as_str), Some("eth_estimateGas"));
        assert!(!calls.iter().any(|m| m == "eth_sendRawTransaction"));
    }

    #[tokio::test]
    async fn test_send_uses_gas_fallback_and_returns_node_hash() {
        let (url, calls) = local_node(|method| {
            chain_reply(method).unwrap_or_else(|| match method {
                "eth_estimateGas" => Reply::Error(-32000, "method not supported"),
                _ => Reply::Result(json!("0xfeed")),
            })
        })
        .await;
        let gateway = EvmGateway::new(&url, Some(contract()))
            .with_signer(Some(SigningKeypair::generate()))
            .with_gas_limit(90_000);

        let tx = gateway.advance_round().await.unwrap();
        assert_eq!(tx.hash, "0xfeed");
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            [
                "eth_chainId",
                "eth_getTransactionCount",
                "eth_gasPrice",
                "eth_estimateGas",
                "eth_sendRawTransaction",
            ]
        );
    }

    #[tokio::test]
    async fn test_round_read_decodes_call_result() {
        let encoded = format!("0x{}", hex::encode(alloy_primitives::U256::from(9u64).abi_encode()));
        let (url, calls) = local_node(move |_| Reply::Result(json!(encoded))).await;
        let gateway = EvmGateway::new(&url, Some(contract()));

        assert_eq!(gateway.get_round().await.unwrap(), 9);
        assert_eq!(calls.lock().unwrap().as_slice(), ["eth_call"]);
    }

    #[tokio::test]
    async fn test_reads_without_contract_fail_before_rpc() {
        let gateway = EvmGateway::new("http://127.0.0.1:1", None);
        assert!(matches!(
            gateway.get_round().await,
            Err(GatewayError::MissingContract)
        ));
    }

    #[tokio::test]
    async fn test_mutation_without_signer_is_missing_credential() {
        let gateway = EvmGateway::new("http://127.0.0.1:1", Some(contract()));
        assert!(gateway.signer().is_none());
        assert!(matches!(
            gateway.advance_round().await,
            Err(GatewayError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_surfaces_rpc_error() {
        let gateway = EvmGateway::new("http://127.0.0.1:1", Some(contract()));
        assert!(matches!(
            gateway.get_outstanding_participants().await,
            Err(GatewayError::Rpc(RpcError::ConnectionFailed(_)))
        ));
    }

    #[test]
    fn test_signer_address() {
        let keypair = SigningKeypair::generate();
        let expected = keypair.address();
        let gateway = EvmGateway::new("http://localhost:8545", Some(contract()))
            .with_signer(Some(keypair))
            .with_gas_limit(100_000)
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(gateway.signer(), Some(expected));
    }
}
