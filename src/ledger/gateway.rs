use super::keys::Keypair;
use super::rpc::LedgerRpc;
use super::transaction::{Autofill, LedgerTransaction};
use super::units::drops_to_xrp;
use super::{LedgerError, LedgerResult};
use crate::config::LedgerConfig;
use crate::error::AppResult;
use crate::models::EscrowView;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// How the network answered a submission or a validated transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// `tes*`
    Success,
    /// `terQUEUED`: held for a later ledger
    Queued,
    /// `tec*`: included in a ledger, fee claimed, but failed
    ClaimedFailure,
    /// `tem*`, `tef*`, `tel*`, other `ter*`: never applied
    Rejected,
}

pub fn classify_engine_result(code: &str) -> EngineOutcome {
    if code.starts_with("tes") {
        EngineOutcome::Success
    } else if code == "terQUEUED" {
        EngineOutcome::Queued
    } else if code.starts_with("tec") {
        EngineOutcome::ClaimedFailure
    } else {
        EngineOutcome::Rejected
    }
}

/// A transaction the node accepted for relay
#[derive(Debug, Clone)]
pub struct SubmittedTx {
    pub hash: String,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
    pub preliminary_result: String,
}

/// A transaction that reached a validated ledger with `tesSUCCESS`
#[derive(Debug, Clone)]
pub struct ValidatedTx {
    pub hash: String,
    pub sequence: u32,
    pub engine_result: String,
    pub ledger_index: Option<u32>,
}

/// Single entry point for ledger reads and submissions
#[derive(Clone)]
pub struct LedgerGateway {
    rpc: Arc<dyn LedgerRpc>,
    config: LedgerConfig,
}

impl LedgerGateway {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: LedgerConfig) -> Self {
        Self { rpc, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Balance in XRP from the validated ledger
    pub async fn account_balance(&self, address: &str) -> AppResult<Decimal> {
        let drops = self.rpc.account_balance_drops(address).await?;
        Ok(drops_to_xrp(drops))
    }

    /// Number of `Payment` transactions in the account's full history
    pub async fn try_payment_count(&self, address: &str) -> LedgerResult<u64> {
        let mut marker: Option<Value> = None;
        let mut count = 0u64;
        let mut pages = 0u32;

        loop {
            let page = self
                .rpc
                .account_tx(address, marker.clone(), self.config.page_size)
                .await?;
            pages += 1;

            if page.transactions.is_empty() {
                break;
            }

            count += page.transactions.iter().filter(|entry| is_payment(entry)).count() as u64;

            match page.marker {
                // a node repeating its marker would otherwise loop forever
                Some(next) if marker.as_ref() != Some(&next) => marker = Some(next),
                _ => break,
            }
        }

        debug!("Counted {} payments for {} over {} page(s)", count, address, pages);
        Ok(count)
    }

    /// Demand signal for pricing; ledger failures count as zero demand
    pub async fn payment_count(&self, address: &str) -> u64 {
        match self.try_payment_count(address).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Payment count for {} unavailable, using 0: {}", address, e);
                0
            }
        }
    }

    /// Active XRP escrows owned by `address`
    pub async fn list_escrows(&self, address: &str) -> AppResult<Vec<EscrowView>> {
        let mut marker: Option<Value> = None;
        let mut views = Vec::new();

        loop {
            let page = self
                .rpc
                .account_escrows(address, marker.clone(), self.config.page_size)
                .await?;

            for object in &page.escrows {
                match EscrowView::from_object(object) {
                    Some(view) => views.push(view),
                    None => debug!("Skipping non-XRP escrow owned by {}", address),
                }
            }

            match page.marker {
                Some(next) if !page.escrows.is_empty() && marker.as_ref() != Some(&next) => {
                    marker = Some(next)
                }
                _ => break,
            }
        }

        Ok(views)
    }

    /// Escrow created by `owner` at `sequence`, if it is still on the ledger
    pub async fn escrow_entry(&self, owner: &str, sequence: u32) -> AppResult<Option<EscrowView>> {
        let object = self.rpc.escrow_entry(owner, sequence).await?;
        Ok(object.as_ref().and_then(EscrowView::from_object))
    }

    /// Sequence, fee and last ledger for the next transaction from `address`
    async fn autofill(&self, address: &str) -> LedgerResult<Autofill> {
        let sequence = self.rpc.account_sequence(address).await?;
        let fee_drops = self.rpc.fee_drops().await?;
        if fee_drops > self.config.max_fee_drops {
            return Err(LedgerError::Signing(format!(
                "network fee {} drops exceeds the {} drop limit",
                fee_drops, self.config.max_fee_drops
            )));
        }

        let current = self.rpc.ledger_current_index().await?;
        Ok(Autofill {
            sequence,
            fee_drops,
            last_ledger_sequence: current.saturating_add(self.config.last_ledger_offset),
        })
    }

    /// Autofill, sign locally with `keypair` and submit the blob.
    ///
    /// Never retried. Preliminary rejections fail immediately.
    pub async fn submit(&self, tx: &LedgerTransaction, keypair: &Keypair) -> LedgerResult<SubmittedTx> {
        let autofill = self.autofill(tx.account()).await?;
        let signed = tx.sign(&autofill, keypair)?;

        let result = self.rpc.submit(&signed).await?;

        info!(
            "Submitted {} from {} (sequence {}): {} ({})",
            tx.kind(),
            tx.account(),
            signed.sequence,
            result.engine_result,
            signed.hash
        );

        if classify_engine_result(&result.engine_result) == EngineOutcome::Rejected {
            return Err(LedgerError::Rejected {
                engine_result: result.engine_result,
                message: result.engine_result_message,
            });
        }

        Ok(SubmittedTx {
            hash: signed.hash,
            sequence: signed.sequence,
            last_ledger_sequence: signed.last_ledger_sequence,
            preliminary_result: result.engine_result,
        })
    }

    /// Poll until the transaction is validated, its last ledger has passed,
    /// or the submit timeout expires
    pub async fn wait_for_validation(&self, submitted: &SubmittedTx) -> LedgerResult<ValidatedTx> {
        let deadline = Instant::now() + self.config.submit_timeout();

        loop {
            let status = self.rpc.transaction_status(&submitted.hash).await?;

            if status.validated {
                let engine_result = status
                    .result
                    .ok_or_else(|| LedgerError::malformed("validated transaction has no result"))?;

                if classify_engine_result(&engine_result) != EngineOutcome::Success {
                    return Err(LedgerError::Rejected {
                        message: format!("transaction {} failed in a validated ledger", submitted.hash),
                        engine_result,
                    });
                }

                return Ok(ValidatedTx {
                    hash: submitted.hash.clone(),
                    sequence: submitted.sequence,
                    engine_result,
                    ledger_index: status.ledger_index,
                });
            }

            let current = self.rpc.ledger_current_index().await?;
            if current > submitted.last_ledger_sequence || Instant::now() >= deadline {
                return Err(LedgerError::NotValidated {
                    hash: submitted.hash.clone(),
                });
            }

            sleep(self.config.poll_interval()).await;
        }
    }

    /// `submit` followed by `wait_for_validation`
    pub async fn submit_and_wait(&self, tx: &LedgerTransaction, keypair: &Keypair) -> LedgerResult<ValidatedTx> {
        let submitted = self.submit(tx, keypair).await?;
        self.wait_for_validation(&submitted).await
    }
}

/// Transaction body sits under `tx`, `tx_json` or `transaction` depending
/// on the API version
fn is_payment(entry: &Value) -> bool {
    ["tx", "tx_json", "transaction"]
        .iter()
        .filter_map(|key| entry.get(*key))
        .next()
        .and_then(|tx| tx.get("TransactionType"))
        .and_then(Value::as_str)
        == Some("Payment")
}
