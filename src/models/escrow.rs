use crate::error::{AppError, AppResult};
use crate::ledger::rpc::EscrowObject;
use crate::ledger::units::{drops_to_xrp, from_ripple_time, parse_drops};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Lifecycle of a purchase escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowState {
    Requested,
    FundsVerified,
    Submitted,
    Confirmed,
    Finished,
    Refunded,
    Rejected,
}

/// Inputs that move an escrow between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowEvent {
    BalanceSufficient,
    BalanceInsufficient,
    TransactionSent,
    TransactionValidated,
    TransactionFailed,
    DeliveryConfirmed,
    DeliveryFailed,
}

impl EscrowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowState::Requested => "requested",
            EscrowState::FundsVerified => "funds_verified",
            EscrowState::Submitted => "submitted",
            EscrowState::Confirmed => "confirmed",
            EscrowState::Finished => "finished",
            EscrowState::Refunded => "refunded",
            EscrowState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EscrowState::Finished | EscrowState::Refunded | EscrowState::Rejected
        )
    }

    /// Next state for `event`; anything not listed is an illegal transition
    pub fn apply(self, event: EscrowEvent) -> AppResult<EscrowState> {
        use EscrowEvent::*;
        use EscrowState::*;

        let next = match (self, event) {
            (Requested, BalanceSufficient) => FundsVerified,
            (Requested, BalanceInsufficient) => Rejected,
            (FundsVerified, TransactionSent) => Submitted,
            (Submitted, TransactionValidated) => Confirmed,
            (Submitted, TransactionFailed) => Rejected,
            (Confirmed, DeliveryConfirmed) => Finished,
            (Confirmed, DeliveryFailed) => Refunded,
            (state, event) => {
                return Err(AppError::EscrowState(format!(
                    "cannot apply {:?} to an escrow in state {}",
                    event,
                    state.as_str()
                )))
            }
        };

        Ok(next)
    }
}

/// Active escrow as reported by the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscrowView {
    pub amount_xrp: Decimal,
    /// Approximation derived from the creating ledger sequence
    pub created_at: Option<DateTime<Utc>>,
    pub finish_after: Option<DateTime<Utc>>,
    pub cancel_after: Option<DateTime<Utc>>,
    pub source: String,
    pub destination: String,
    pub previous_txn_id: Option<String>,
    pub previous_txn_lgr_seq: Option<u32>,
}

impl EscrowView {
    /// Convert a ledger object; `None` for non-XRP escrows
    pub fn from_object(object: &EscrowObject) -> Option<Self> {
        let drops = object.amount.as_str().and_then(parse_drops)?;

        Some(Self {
            amount_xrp: drops_to_xrp(drops),
            created_at: object.previous_txn_lgr_seq.map(from_ripple_time),
            finish_after: object.finish_after.map(from_ripple_time),
            cancel_after: object.cancel_after.map(from_ripple_time),
            source: object.account.clone(),
            destination: object.destination.clone(),
            previous_txn_id: object.previous_txn_id.clone(),
            previous_txn_lgr_seq: object.previous_txn_lgr_seq,
        })
    }
}

/// Result of a validated `EscrowCreate`
#[derive(Debug, Clone, Serialize)]
pub struct EscrowReceipt {
    pub state: EscrowState,
    pub tx_hash: String,
    /// Sequence of the creating transaction; needed to finish or cancel
    pub offer_sequence: u32,
    pub amount_xrp: Decimal,
    pub source: String,
    pub destination: String,
    pub finish_after: DateTime<Utc>,
    pub cancel_after: Option<DateTime<Utc>>,
    pub ledger_index: Option<u32>,
}

/// Result of a validated `EscrowFinish` or `EscrowCancel`
#[derive(Debug, Clone, Serialize)]
pub struct EscrowSettlement {
    pub state: EscrowState,
    pub tx_hash: String,
    pub engine_result: String,
    pub owner: String,
    pub offer_sequence: u32,
    pub ledger_index: Option<u32>,
}
