//! Escrow lifecycle on the ledger: create with a balance precondition,
//! release to the seller, or refund to the buyer once the cancel window
//! opens. Every step is checked against [`EscrowState`].

use crate::config::EscrowConfig;
use crate::error::{AppError, AppResult};
use crate::ledger::units::{from_ripple_time, ripple_now, xrp_to_drops};
use crate::ledger::{Keypair, LedgerGateway, LedgerTransaction};
use crate::models::{EscrowEvent, EscrowReceipt, EscrowSettlement, EscrowState, EscrowView, Wallet};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct EscrowManager {
    gateway: Arc<LedgerGateway>,
    config: EscrowConfig,
}

impl EscrowManager {
    pub fn new(gateway: Arc<LedgerGateway>, config: EscrowConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    /// Lock `amount_xrp` from `buyer` for `destination`.
    ///
    /// Requires `balance >= amount + fee buffer`. Finish opens after the
    /// configured offset and refund after the cancel window.
    pub async fn create_escrow(
        &self,
        buyer: &Wallet,
        destination: &Wallet,
        amount_xrp: Decimal,
    ) -> AppResult<EscrowReceipt> {
        if amount_xrp <= Decimal::ZERO {
            return Err(AppError::InvalidArgument(format!(
                "escrow amount {} XRP must be positive",
                amount_xrp
            )));
        }
        let drops = xrp_to_drops(amount_xrp)?;
        let signer = buyer.signer()?;

        let mut state = EscrowState::Requested;

        let balance = self.gateway.account_balance(buyer.classic_address()).await?;
        let required = amount_xrp + self.config.fee_buffer_xrp;
        if balance < required {
            state = state.apply(EscrowEvent::BalanceInsufficient)?;
            warn!(
                "Escrow from {} {}: balance {} XRP below required {} XRP",
                buyer.classic_address(),
                state.as_str(),
                balance,
                required
            );
            return Err(AppError::InsufficientFunds { balance, required });
        }
        state = state.apply(EscrowEvent::BalanceSufficient)?;

        let finish_after = ripple_now().saturating_add(self.config.finish_after_secs);
        let cancel_after = finish_after.saturating_add(self.config.cancel_window_secs);

        let tx = LedgerTransaction::EscrowCreate {
            account: buyer.classic_address().to_string(),
            destination: destination.classic_address().to_string(),
            amount: drops.to_string(),
            finish_after,
            cancel_after: Some(cancel_after),
        };

        state = state.apply(EscrowEvent::TransactionSent)?;
        let validated = match self.gateway.submit_and_wait(&tx, signer).await {
            Ok(validated) => validated,
            Err(e) => {
                let state = state.apply(EscrowEvent::TransactionFailed)?;
                error!(
                    "EscrowCreate from {} {}: {}",
                    buyer.classic_address(),
                    state.as_str(),
                    e
                );
                return Err(e.into());
            }
        };
        state = state.apply(EscrowEvent::TransactionValidated)?;

        let offer_sequence = validated.sequence;

        info!(
            "Escrow {}:{} for {} XRP to {} {}",
            buyer.classic_address(),
            offer_sequence,
            amount_xrp,
            destination.classic_address(),
            state.as_str()
        );

        Ok(EscrowReceipt {
            state,
            tx_hash: validated.hash,
            offer_sequence,
            amount_xrp,
            source: buyer.classic_address().to_string(),
            destination: destination.classic_address().to_string(),
            finish_after: from_ripple_time(finish_after),
            cancel_after: Some(from_ripple_time(cancel_after)),
            ledger_index: validated.ledger_index,
        })
    }

    /// Release the buyer's escrow to its destination
    pub async fn finish_escrow(
        &self,
        buyer: &Wallet,
        offer_sequence: Option<u32>,
    ) -> AppResult<EscrowSettlement> {
        let offer_sequence = require_sequence(offer_sequence)?;
        let signer = buyer.signer()?;
        let escrow = self.active_escrow(buyer, offer_sequence).await?;

        if let Some(finish_after) = escrow.finish_after {
            if Utc::now() <= finish_after {
                return Err(AppError::EscrowState(format!(
                    "escrow {}:{} cannot be finished before {}",
                    buyer.classic_address(),
                    offer_sequence,
                    finish_after.to_rfc3339()
                )));
            }
        }

        let tx = LedgerTransaction::EscrowFinish {
            account: buyer.classic_address().to_string(),
            owner: buyer.classic_address().to_string(),
            offer_sequence,
        };

        self.settle(buyer, offer_sequence, tx, EscrowEvent::DeliveryConfirmed, signer)
            .await
    }

    /// Refund the buyer's escrow once its cancel window has opened
    pub async fn cancel_escrow(
        &self,
        buyer: &Wallet,
        offer_sequence: Option<u32>,
    ) -> AppResult<EscrowSettlement> {
        let offer_sequence = require_sequence(offer_sequence)?;
        let signer = buyer.signer()?;
        let escrow = self.active_escrow(buyer, offer_sequence).await?;

        let cancel_after = escrow.cancel_after.ok_or_else(|| {
            AppError::EscrowState(format!(
                "escrow {}:{} has no cancel time and cannot be refunded",
                buyer.classic_address(),
                offer_sequence
            ))
        })?;

        if Utc::now() <= cancel_after {
            return Err(AppError::EscrowState(format!(
                "escrow {}:{} can be refunded after {}",
                buyer.classic_address(),
                offer_sequence,
                cancel_after.to_rfc3339()
            )));
        }

        let tx = LedgerTransaction::EscrowCancel {
            account: buyer.classic_address().to_string(),
            owner: buyer.classic_address().to_string(),
            offer_sequence,
        };

        self.settle(buyer, offer_sequence, tx, EscrowEvent::DeliveryFailed, signer)
            .await
    }

    /// Active escrows owned by `owner`
    pub async fn list_escrows(&self, owner: &str) -> AppResult<Vec<EscrowView>> {
        self.gateway.list_escrows(owner).await
    }

    async fn active_escrow(&self, buyer: &Wallet, offer_sequence: u32) -> AppResult<EscrowView> {
        self.gateway
            .escrow_entry(buyer.classic_address(), offer_sequence)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active escrow {}:{}",
                    buyer.classic_address(),
                    offer_sequence
                ))
            })
    }

    async fn settle(
        &self,
        buyer: &Wallet,
        offer_sequence: u32,
        tx: LedgerTransaction,
        event: EscrowEvent,
        signer: &Keypair,
    ) -> AppResult<EscrowSettlement> {
        // an escrow still on the ledger has been confirmed
        let state = EscrowState::Confirmed;

        let validated = self.gateway.submit_and_wait(&tx, signer).await.map_err(|e| {
            error!(
                "{} for escrow {}:{} failed: {}",
                tx.kind(),
                buyer.classic_address(),
                offer_sequence,
                e
            );
            AppError::from(e)
        })?;

        let state = state.apply(event)?;
        info!(
            "Escrow {}:{} {} ({})",
            buyer.classic_address(),
            offer_sequence,
            state.as_str(),
            validated.hash
        );

        Ok(EscrowSettlement {
            state,
            tx_hash: validated.hash,
            engine_result: validated.engine_result,
            owner: buyer.classic_address().to_string(),
            offer_sequence,
            ledger_index: validated.ledger_index,
        })
    }
}

fn require_sequence(offer_sequence: Option<u32>) -> AppResult<u32> {
    offer_sequence
        .ok_or_else(|| AppError::InvalidArgument("escrow offer sequence is required".to_string()))
}
