use super::{LedgerResult, SignedTransaction};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// One page of `account_tx` results
#[derive(Debug, Clone, Default)]
pub struct AccountTxPage {
    /// Raw entries; the transaction body sits under `tx`, `tx_json` or
    /// `transaction` depending on API version
    pub transactions: Vec<Value>,
    pub marker: Option<Value>,
}

/// Escrow ledger object as returned by `account_objects` / `ledger_entry`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EscrowObject {
    pub account: String,
    pub destination: String,
    /// Drops string for XRP escrows
    pub amount: Value,
    #[serde(default)]
    pub finish_after: Option<u32>,
    #[serde(default)]
    pub cancel_after: Option<u32>,
    #[serde(default, rename = "PreviousTxnID")]
    pub previous_txn_id: Option<String>,
    #[serde(default)]
    pub previous_txn_lgr_seq: Option<u32>,
}

/// One page of escrow objects owned by an account
#[derive(Debug, Clone, Default)]
pub struct EscrowObjectsPage {
    pub escrows: Vec<EscrowObject>,
    pub marker: Option<Value>,
}

/// Preliminary outcome of a submission
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub engine_result: String,
    pub engine_result_message: String,
}

/// Lookup of a submitted transaction by hash
#[derive(Debug, Clone, Default)]
pub struct TxStatus {
    pub validated: bool,
    /// `meta.TransactionResult` once known
    pub result: Option<String>,
    pub ledger_index: Option<u32>,
}

/// Transport seam between the gateway and an XRPL node
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Balance in drops from the latest validated ledger
    async fn account_balance_drops(&self, address: &str) -> LedgerResult<u64>;

    async fn account_tx(
        &self,
        address: &str,
        marker: Option<Value>,
        limit: u32,
    ) -> LedgerResult<AccountTxPage>;

    async fn account_escrows(
        &self,
        address: &str,
        marker: Option<Value>,
        limit: u32,
    ) -> LedgerResult<EscrowObjectsPage>;

    /// Escrow created by `owner` with the given sequence, if it still exists
    async fn escrow_entry(&self, owner: &str, sequence: u32) -> LedgerResult<Option<EscrowObject>>;

    async fn ledger_current_index(&self) -> LedgerResult<u32>;

    /// Next `Sequence` for the account, from the current open ledger
    async fn account_sequence(&self, address: &str) -> LedgerResult<u32>;

    /// Transaction cost in drops for the open ledger
    async fn fee_drops(&self) -> LedgerResult<u64>;

    /// Submit a locally signed blob
    async fn submit(&self, signed: &SignedTransaction) -> LedgerResult<SubmitResult>;

    async fn transaction_status(&self, hash: &str) -> LedgerResult<TxStatus>;
}
