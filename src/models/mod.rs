//! Domain models for the xStreet backend.
//!
//! Catalog rows (products, profiles) are read-only here; price history is
//! the only table this service writes. Escrows live on the ledger.

pub mod escrow;
pub mod price_history;
pub mod product;
pub mod profile;
pub mod wallet;

pub use escrow::{EscrowEvent, EscrowReceipt, EscrowSettlement, EscrowState, EscrowView};
pub use price_history::{NewPriceRecord, PriceHistoryRecord, ProductPriceSeries};
pub use product::Product;
pub use profile::Profile;
pub use wallet::Wallet;
