//! JSON-RPC client for an XRPL node (rippled / clio).

use super::rpc::{AccountTxPage, EscrowObject, EscrowObjectsPage, LedgerRpc, SubmitResult, TxStatus};
use super::{LedgerError, LedgerResult, SignedTransaction};
use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

/// XRPL node client over HTTPS JSON-RPC
pub struct XrplClient {
    http: reqwest::Client,
    rpc_url: String,
    retry: RetryPolicy,
}

impl XrplClient {
    /// Create a new client against the configured node
    pub fn new(config: &LedgerConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build ledger HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            retry: RetryPolicy::new(config.max_retries, 250, 2_000, 0.2),
        })
    }

    /// Issue one JSON-RPC call and return its `result` object
    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        debug!("XRPL request: {}", method);

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({ "method": method, "params": [params] }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Timeout(method.to_string())
                } else {
                    LedgerError::Transport(e)
                }
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                return Err(LedgerError::RateLimited(format!(
                    "{} answered HTTP {}",
                    method,
                    response.status()
                )));
            }
            status if !status.is_success() => {
                return Err(LedgerError::Rpc {
                    error: format!("http_{}", status.as_u16()),
                    message: format!("{} answered HTTP {}", method, status),
                });
            }
            _ => {}
        }

        let body: Value = response.json().await?;
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::malformed(format!("{} response has no result", method)))?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            return Err(rpc_error(&result));
        }

        Ok(result)
    }

    /// Read-only call with retry on transient failures
    async fn query(&self, method: &str, params: Value) -> LedgerResult<Value> {
        self.retry
            .retry_if(|_| self.call(method, params.clone()), LedgerError::is_retryable)
            .await
    }
}

fn rpc_error(result: &Value) -> LedgerError {
    let error = result
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = result
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match error.as_str() {
        "slowDown" | "tooBusy" => LedgerError::RateLimited(error),
        _ => LedgerError::Rpc { error, message },
    }
}

fn is_rpc_error(err: &LedgerError, code: &str) -> bool {
    matches!(err, LedgerError::Rpc { error, .. } if error == code)
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    value.and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok())
}

/// Open-ledger fee from a `fee` result, falling back to the base fee
fn parse_fee_drops(result: &Value) -> Option<u64> {
    ["/drops/open_ledger_fee", "/drops/base_fee"]
        .iter()
        .find_map(|path| result.pointer(path).and_then(Value::as_str))
        .and_then(|raw| raw.parse::<u64>().ok())
}

fn account_not_found(address: &str) -> impl Fn(LedgerError) -> LedgerError + '_ {
    move |e| {
        if is_rpc_error(&e, "actNotFound") {
            LedgerError::AccountNotFound(address.to_string())
        } else {
            e
        }
    }
}

#[async_trait]
impl LedgerRpc for XrplClient {
    async fn account_balance_drops(&self, address: &str) -> LedgerResult<u64> {
        let result = self
            .query(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await
            .map_err(account_not_found(address))?;

        result
            .pointer("/account_data/Balance")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<u64>().ok())
            .ok_or_else(|| LedgerError::malformed("account_info has no Balance"))
    }

    async fn account_tx(
        &self,
        address: &str,
        marker: Option<Value>,
        limit: u32,
    ) -> LedgerResult<AccountTxPage> {
        let mut params = json!({
            "account": address,
            "ledger_index_min": -1,
            "ledger_index_max": -1,
            "limit": limit,
        });
        if let Some(marker) = marker {
            params["marker"] = marker;
        }

        let result = self.query("account_tx", params).await
            .map_err(account_not_found(address))?;

        let transactions = result
            .get("transactions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(AccountTxPage {
            transactions,
            marker: result.get("marker").filter(|m| !m.is_null()).cloned(),
        })
    }

    async fn account_escrows(
        &self,
        address: &str,
        marker: Option<Value>,
        limit: u32,
    ) -> LedgerResult<EscrowObjectsPage> {
        let mut params = json!({
            "account": address,
            "type": "escrow",
            "ledger_index": "validated",
            "limit": limit,
        });
        if let Some(marker) = marker {
            params["marker"] = marker;
        }

        let result = self.query("account_objects", params).await
            .map_err(account_not_found(address))?;

        let objects = result
            .get("account_objects")
            .cloned()
            .unwrap_or_else(|| Value::Array(vec![]));
        let escrows: Vec<EscrowObject> = serde_json::from_value(objects)
            .map_err(|e| LedgerError::malformed(format!("escrow objects: {}", e)))?;

        Ok(EscrowObjectsPage {
            escrows,
            marker: result.get("marker").filter(|m| !m.is_null()).cloned(),
        })
    }

    async fn escrow_entry(&self, owner: &str, sequence: u32) -> LedgerResult<Option<EscrowObject>> {
        let result = self
            .query(
                "ledger_entry",
                json!({
                    "escrow": { "owner": owner, "seq": sequence },
                    "ledger_index": "validated",
                }),
            )
            .await;

        match result {
            Ok(result) => {
                let node = result
                    .get("node")
                    .cloned()
                    .ok_or_else(|| LedgerError::malformed("ledger_entry has no node"))?;
                let escrow = serde_json::from_value(node)
                    .map_err(|e| LedgerError::malformed(format!("escrow entry: {}", e)))?;
                Ok(Some(escrow))
            }
            Err(e) if is_rpc_error(&e, "entryNotFound") => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn ledger_current_index(&self) -> LedgerResult<u32> {
        let result = self.query("ledger_current", json!({})).await?;
        as_u32(result.get("ledger_current_index"))
            .ok_or_else(|| LedgerError::malformed("ledger_current has no ledger_current_index"))
    }

    async fn account_sequence(&self, address: &str) -> LedgerResult<u32> {
        let result = self
            .query(
                "account_info",
                json!({ "account": address, "ledger_index": "current" }),
            )
            .await
            .map_err(account_not_found(address))?;

        as_u32(result.pointer("/account_data/Sequence"))
            .ok_or_else(|| LedgerError::malformed("account_info has no Sequence"))
    }

    async fn fee_drops(&self) -> LedgerResult<u64> {
        let result = self.query("fee", json!({})).await?;
        parse_fee_drops(&result).ok_or_else(|| LedgerError::malformed("fee has no drops"))
    }

    async fn submit(&self, signed: &SignedTransaction) -> LedgerResult<SubmitResult> {
        // never retried: the node may already have relayed the transaction
        let result = self
            .call("submit", json!({ "tx_blob": signed.tx_blob }))
            .await?;

        let engine_result = result
            .get("engine_result")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::malformed("submit has no engine_result"))?
            .to_string();

        Ok(SubmitResult {
            engine_result,
            engine_result_message: result
                .get("engine_result_message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn transaction_status(&self, hash: &str) -> LedgerResult<TxStatus> {
        let result = self
            .query("tx", json!({ "transaction": hash, "binary": false }))
            .await;

        match result {
            Ok(result) => Ok(TxStatus {
                validated: result.get("validated").and_then(Value::as_bool).unwrap_or(false),
                result: result
                    .pointer("/meta/TransactionResult")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                ledger_index: as_u32(result.get("ledger_index")),
            }),
            // not yet seen by the node
            Err(e) if is_rpc_error(&e, "txnNotFound") => Ok(TxStatus::default()),
            Err(e) => Err(e),
        }
    }
}
