//! xStreet Backend Library
//!
//! Dynamic pricing and XRP Ledger escrow settlement for the xStreet
//! marketplace. Exposes the components for the binary and for tests.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod repositories;
pub mod retry;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use auth::IdentityVerifier;
use config::{EscrowConfig, LedgerConfig, PriceFeedConfig, PricingConfig};
use database::Database;
use ledger::{LedgerGateway, LedgerRpc};
use pricing::PricingEngine;
use repositories::{
    PriceHistoryRepository, PriceHistoryStore, ProductCatalog, ProductRepository, ProfileDirectory,
    ProfileRepository,
};
use services::{CurrencyConverter, EscrowManager, FaucetClient, PricingCycleService, PurchaseService};
use std::sync::Arc;

/// Store handles shared by the services
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn ProductCatalog>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub history: Arc<dyn PriceHistoryStore>,
}

impl Stores {
    /// Postgres-backed stores over one pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            catalog: Arc::new(ProductRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            history: Arc::new(PriceHistoryRepository::new(pool)),
        }
    }
}

/// Application state containing all services
pub struct AppState {
    pub database: Option<Database>,
    pub gateway: Arc<LedgerGateway>,
    pub pricing: Arc<PricingCycleService>,
    pub purchases: Arc<PurchaseService>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub converter: Arc<CurrencyConverter>,
    pub faucet: Arc<FaucetClient>,
}

impl AppState {
    /// Wire every service from its collaborators
    pub fn from_parts(
        stores: Stores,
        rpc: Arc<dyn LedgerRpc>,
        identity: Arc<dyn IdentityVerifier>,
        ledger: LedgerConfig,
        pricing: PricingConfig,
        escrow: EscrowConfig,
        price_feed: PriceFeedConfig,
    ) -> AppResult<Self> {
        let converter = Arc::new(CurrencyConverter::new(price_feed)?);
        let gateway = Arc::new(LedgerGateway::new(rpc, ledger));
        let faucet = Arc::new(FaucetClient::new(gateway.clone())?);

        let pricing = Arc::new(PricingCycleService::new(
            stores.catalog.clone(),
            stores.history.clone(),
            gateway.clone(),
            PricingEngine::linear(pricing),
        ));

        let escrows = Arc::new(EscrowManager::new(gateway.clone(), escrow));
        let purchases = Arc::new(PurchaseService::new(
            stores.catalog,
            stores.profiles,
            stores.history,
            escrows,
        ));

        Ok(Self {
            database: None,
            gateway,
            pricing,
            purchases,
            identity,
            converter,
            faucet,
        })
    }

    /// Attach the pool used by the health check
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}
