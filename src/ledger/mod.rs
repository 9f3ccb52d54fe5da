//! XRP Ledger access: JSON-RPC transport, local keys and signing, unit
//! conversions and the gateway the services talk to.

pub mod address;
pub mod codec;
mod error;
mod gateway;
pub mod keys;
pub mod rpc;
pub mod transaction;
pub mod units;
mod xrpl_client;

pub use error::{LedgerError, LedgerResult};
pub use gateway::{classify_engine_result, EngineOutcome, LedgerGateway, SubmittedTx, ValidatedTx};
pub use keys::Keypair;
pub use rpc::{AccountTxPage, EscrowObject, EscrowObjectsPage, LedgerRpc, SubmitResult, TxStatus};
pub use transaction::{Autofill, LedgerTransaction, SignedTransaction};
pub use xrpl_client::XrplClient;
