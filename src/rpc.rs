//! JSON-RPC wallet connector.
//!
//! Talks to a wallet that exposes an EIP-1193 style HTTP endpoint (Frame, a
//! dev node with unlocked accounts, ...). Keys never leave the wallet: writes
//! go through `eth_sendTransaction` and the wallet does the signing.

use crate::chain::{
    AccountStatus,
    Address,
    ChainClient,
    ChainError,
    ChainResult,
    LogEntry,
    Receipt,
    TxHash,
    decode_hex,
};
use futures::{
    FutureExt,
    future::BoxFuture,
};
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::{
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::Duration,
};
use tracing::{
    debug,
    warn,
};

const USER_REJECTED: i64 = 4001;
const UNRECOGNIZED_CHAIN: i64 = 4902;

pub const DEFAULT_RECEIPT_POLL: Duration = Duration::from_millis(1_000);

pub struct RpcWallet {
    url: String,
    http: reqwest::Client,
    receipt_poll: Duration,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

impl RpcWallet {
    pub fn new(url: impl Into<String>) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
            receipt_poll: DEFAULT_RECEIPT_POLL,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_receipt_poll(mut self, interval: Duration) -> Self {
        self.receipt_poll = interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("{method}: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!(
                "{method}: wallet responded with {status}"
            )));
        }
        let response: RpcResponse = res
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;
        if let Some(err) = response.error {
            return Err(match err.code {
                USER_REJECTED => ChainError::Rejected(err.message),
                code => ChainError::Rpc {
                    code,
                    message: err.message,
                },
            });
        }
        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))
    }

    async fn primary_account(&self) -> ChainResult<Address> {
        let mut accounts: Vec<String> = self.request("eth_accounts", json!([])).await?;
        if accounts.is_empty() {
            accounts = self.request("eth_requestAccounts", json!([])).await?;
        }
        accounts
            .first()
            .ok_or(ChainError::NotConnected)?
            .parse()
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&raw).and_then(|id| {
            u64::try_from(id)
                .map_err(|_| ChainError::InvalidResponse(format!("chain id {raw} out of range")))
        })
    }
}

impl ChainClient for RpcWallet {
    fn account_status(&self) -> BoxFuture<'_, ChainResult<AccountStatus>> {
        async move {
            let address = self.primary_account().await?;
            let chain_id = self.chain_id().await?;
            Ok(AccountStatus { address, chain_id })
        }
        .boxed()
    }

    fn balance(&self, address: Address, chain_id: u64) -> BoxFuture<'_, ChainResult<u128>> {
        async move {
            let current = self.chain_id().await?;
            if current != chain_id {
                return Err(ChainError::UnknownChain(chain_id));
            }
            let raw: String = self
                .request("eth_getBalance", json!([address.to_string(), "latest"]))
                .await?;
            parse_quantity(&raw)
        }
        .boxed()
    }

    fn read_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
    ) -> BoxFuture<'_, ChainResult<Vec<u8>>> {
        async move {
            let call = json!({
                "to": contract.to_string(),
                "data": format!("0x{}", hex::encode(&calldata)),
            });
            let raw: String = self.request("eth_call", json!([call, "latest"])).await?;
            decode_hex(&raw)
        }
        .boxed()
    }

    fn write_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
        value: u128,
    ) -> BoxFuture<'_, ChainResult<TxHash>> {
        async move {
            let from = self.primary_account().await?;
            let tx = json!({
                "from": from.to_string(),
                "to": contract.to_string(),
                "data": format!("0x{}", hex::encode(&calldata)),
                "value": format!("0x{:x}", value),
            });
            let raw: String = self.request("eth_sendTransaction", json!([tx])).await?;
            raw.parse()
        }
        .boxed()
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<Receipt>> {
        async move {
            loop {
                let receipt: Option<RpcReceipt> = self
                    .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                    .await?;
                match receipt {
                    Some(receipt) => return receipt.into_receipt(),
                    None => tokio::time::sleep(self.receipt_poll).await,
                }
            }
        }
        .boxed()
    }

    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ChainResult<()>> {
        async move {
            let params = json!([{ "chainId": format!("0x{:x}", chain_id) }]);
            match self
                .request::<Value>("wallet_switchEthereumChain", params)
                .await
            {
                Ok(_) => Ok(()),
                Err(ChainError::Rpc {
                    code: UNRECOGNIZED_CHAIN,
                    ..
                }) => Err(ChainError::UnknownChain(chain_id)),
                Err(e) => {
                    warn!(chain_id, error = %e, "wallet refused chain switch");
                    Err(e)
                }
            }
        }
        .boxed()
    }
}

impl RpcLog {
    fn into_entry(self) -> ChainResult<LogEntry> {
        let topics = self
            .topics
            .iter()
            .map(|topic| topic.parse::<TxHash>().map(|h| h.0))
            .collect::<ChainResult<Vec<_>>>()?;
        Ok(LogEntry {
            address: self.address.parse()?,
            topics,
            data: decode_hex(&self.data)?,
        })
    }
}

impl RpcReceipt {
    fn into_receipt(self) -> ChainResult<Receipt> {
        let success = match self.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };
        let logs = self
            .logs
            .into_iter()
            .enumerate()
            .filter_map(|(index, log)| match log.into_entry() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(index, error = %e, "skipping undecodable receipt log");
                    None
                }
            })
            .collect();
        Ok(Receipt {
            tx_hash: self.transaction_hash.parse()?,
            success,
            logs,
        })
    }
}

/// Parses a JSON-RPC hex quantity (`"0x2eb"`).
pub fn parse_quantity(raw: &str) -> ChainResult<u128> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("quantity '{raw}' lacks 0x")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("quantity '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn parse_quantity__reads_hex() {
        assert_eq!(parse_quantity("0x2eb").unwrap(), 747);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("747").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn into_receipt__converts_status_and_logs() {
        // given
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x1",
            "logs": [{
                "address": format!("0x{}", "22".repeat(20)),
                "topics": [format!("0x{}", "33".repeat(32))],
                "data": "0x0001",
            }],
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();

        // when
        let receipt = receipt.into_receipt().unwrap();

        // then
        assert!(receipt.success);
        assert_eq!(receipt.tx_hash, TxHash([0x11; 32]));
        assert_eq!(receipt.logs[0].address, Address([0x22; 20]));
        assert_eq!(receipt.logs[0].topics, vec![[0x33; 32]]);
        assert_eq!(receipt.logs[0].data, vec![0x00, 0x01]);
    }

    #[test]
    fn into_receipt__reverted_status_is_not_success() {
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x0",
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert!(!receipt.into_receipt().unwrap().success);
    }

    #[test]
    fn into_receipt__skips_undecodable_logs() {
        // given
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x1",
            "logs": [
                {
                    "address": "0xnot-an-address",
                    "topics": [],
                    "data": "0x",
                },
                {
                    "address": format!("0x{}", "22".repeat(20)),
                    "topics": [format!("0x{}", "33".repeat(32))],
                    "data": "0xzz",
                },
                {
                    "address": format!("0x{}", "44".repeat(20)),
                    "topics": [],
                    "data": "0x",
                },
            ],
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();

        // when
        let receipt = receipt.into_receipt().unwrap();

        // then
        assert!(receipt.success);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].address, Address([0x44; 20]));
    }
}
