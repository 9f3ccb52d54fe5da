pub mod currency;
pub mod escrow_manager;
pub mod faucet;
pub mod pricing_cycle;
pub mod purchase;

pub use currency::{Conversion, CurrencyConverter};
pub use escrow_manager::EscrowManager;
pub use faucet::{FaucetClient, FaucetWallet};
pub use pricing_cycle::PricingCycleService;
pub use purchase::{OrderView, PurchaseService};
