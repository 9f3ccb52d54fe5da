#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use xstreet_backend::auth::{AuthenticatedUser, IdentityVerifier};
use xstreet_backend::config::{
    DatabaseConfig, EscrowConfig, LedgerConfig, PriceFeedConfig, PricingConfig,
};
use xstreet_backend::database::{create_pool, run_migrations};
use xstreet_backend::error::{RepositoryError, RepositoryResult};
use xstreet_backend::ledger::units::to_ripple_time;
use xstreet_backend::ledger::{
    AccountTxPage, EscrowObject, EscrowObjectsPage, LedgerError, LedgerGateway, LedgerResult,
    LedgerRpc, SignedTransaction, SubmitResult, TxStatus,
};
use xstreet_backend::models::{Product, Profile};
use xstreet_backend::repositories::{
    InMemoryCatalog, InMemoryPriceHistory, PriceHistoryRepository, ProductCatalog,
    ProductRepository, ProfileRepository,
};
use xstreet_backend::{AppError, AppResult, AppState, Stores};

/// Derived from `ED25519_SEED`
pub const BUYER_ADDRESS: &str = "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW";
pub const SELLER_ADDRESS: &str = "rFmuWZgVh8JVH25oTf9wBVXxUGYLFUCi5";
pub const OTHER_ADDRESS: &str = "rfsLyQTzYFhY2RvxUyf4wKA2eRdcyj8HTG";
pub const ED25519_SEED: &str = "sEdSJHdnVumf99WfaHTnU8DaQkx5Q4n";
pub const ED25519_PRIVATE_KEY: &str = "EDDAA295BEED4E2EE94C24015B56AF626B4F21EF9F44F2B3D40FC41C90900A6BF1";
pub const SECP256K1_SEED: &str = "spvHRYpBKVWy8aYvjDrEJxG79mwN3";
/// Derived from `SECP256K1_SEED`
pub const SECP256K1_ADDRESS: &str = "rDwsjm4ecjNxtYmeaiCMriQ85w1XUocea3";
pub const VALID_TOKEN: &str = "valid-token";

// ============================================================================
// Scripted ledger
// ============================================================================

/// In-process `LedgerRpc` answering from scripted state
pub struct MockLedger {
    balances: Mutex<HashMap<String, u64>>,
    tx_pages: Mutex<HashMap<String, Vec<Vec<Value>>>>,
    escrows: Mutex<HashMap<String, Vec<EscrowObject>>>,
    entries: Mutex<HashMap<(String, u32), EscrowObject>>,
    submit_result: Mutex<String>,
    validated_result: Mutex<Option<String>>,
    submitted: Mutex<Vec<Value>>,
    blobs: Mutex<Vec<String>>,
    ledger_index: AtomicU32,
    next_sequence: AtomicU32,
    fail_account_tx: AtomicBool,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            tx_pages: Mutex::new(HashMap::new()),
            escrows: Mutex::new(HashMap::new()),
            entries: Mutex::new(HashMap::new()),
            submit_result: Mutex::new("tesSUCCESS".to_string()),
            validated_result: Mutex::new(Some("tesSUCCESS".to_string())),
            submitted: Mutex::new(Vec::new()),
            blobs: Mutex::new(Vec::new()),
            ledger_index: AtomicU32::new(1_000),
            next_sequence: AtomicU32::new(42),
            fail_account_tx: AtomicBool::new(false),
        }
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, address: &str, drops: u64) -> Self {
        self.fund(address, drops);
        self
    }

    /// Credit `address`, creating the account if needed
    pub fn fund(&self, address: &str, drops: u64) {
        *self
            .balances
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default() += drops;
    }

    /// Each inner vec is one `account_tx` page of transaction types
    pub fn with_tx_pages(self, address: &str, pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|kind| json!({ "tx": { "TransactionType": kind }, "validated": true }))
                    .collect()
            })
            .collect();
        self.tx_pages.lock().unwrap().insert(address.to_string(), pages);
        self
    }

    pub fn with_escrow(self, object: EscrowObject) -> Self {
        self.escrows
            .lock()
            .unwrap()
            .entry(object.account.clone())
            .or_default()
            .push(object);
        self
    }

    pub fn with_entry(self, owner: &str, sequence: u32, object: EscrowObject) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert((owner.to_string(), sequence), object);
        self
    }

    pub fn with_submit_result(self, engine_result: &str) -> Self {
        *self.submit_result.lock().unwrap() = engine_result.to_string();
        self
    }

    /// `None` keeps the transaction unvalidated forever
    pub fn with_validated_result(self, engine_result: Option<&str>) -> Self {
        *self.validated_result.lock().unwrap() = engine_result.map(str::to_string);
        self
    }

    pub fn failing_account_tx(self) -> Self {
        self.fail_account_tx.store(true, Ordering::SeqCst);
        self
    }

    /// Signed `tx_json` bodies handed to `submit`, in order
    pub fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().unwrap().clone()
    }

    /// Hex blobs handed to `submit`, in order
    pub fn blobs(&self) -> Vec<String> {
        self.blobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn account_balance_drops(&self, address: &str) -> LedgerResult<u64> {
        self.balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(address.to_string()))
    }

    async fn account_tx(
        &self,
        address: &str,
        marker: Option<Value>,
        _limit: u32,
    ) -> LedgerResult<AccountTxPage> {
        if self.fail_account_tx.load(Ordering::SeqCst) {
            return Err(LedgerError::Timeout("account_tx".to_string()));
        }

        let pages = self.tx_pages.lock().unwrap();
        let pages = match pages.get(address) {
            Some(pages) => pages,
            None => return Err(LedgerError::AccountNotFound(address.to_string())),
        };

        let index = marker.and_then(|m| m.as_u64()).unwrap_or(0) as usize;
        let transactions = pages.get(index).cloned().unwrap_or_default();
        let marker = (index + 1 < pages.len()).then(|| json!(index + 1));

        Ok(AccountTxPage { transactions, marker })
    }

    async fn account_escrows(
        &self,
        address: &str,
        _marker: Option<Value>,
        _limit: u32,
    ) -> LedgerResult<EscrowObjectsPage> {
        Ok(EscrowObjectsPage {
            escrows: self
                .escrows
                .lock()
                .unwrap()
                .get(address)
                .cloned()
                .unwrap_or_default(),
            marker: None,
        })
    }

    async fn escrow_entry(&self, owner: &str, sequence: u32) -> LedgerResult<Option<EscrowObject>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(owner.to_string(), sequence))
            .cloned())
    }

    async fn ledger_current_index(&self) -> LedgerResult<u32> {
        Ok(self.ledger_index.fetch_add(1, Ordering::SeqCst))
    }

    async fn account_sequence(&self, _address: &str) -> LedgerResult<u32> {
        Ok(self.next_sequence.fetch_add(1, Ordering::SeqCst))
    }

    async fn fee_drops(&self) -> LedgerResult<u64> {
        Ok(12)
    }

    async fn submit(&self, signed: &SignedTransaction) -> LedgerResult<SubmitResult> {
        self.submitted.lock().unwrap().push(signed.tx_json.clone());
        self.blobs.lock().unwrap().push(signed.tx_blob.clone());

        Ok(SubmitResult {
            engine_result: self.submit_result.lock().unwrap().clone(),
            engine_result_message: "scripted".to_string(),
        })
    }

    async fn transaction_status(&self, _hash: &str) -> LedgerResult<TxStatus> {
        match self.validated_result.lock().unwrap().clone() {
            Some(result) => Ok(TxStatus {
                validated: true,
                result: Some(result),
                ledger_index: Some(self.ledger_index.load(Ordering::SeqCst)),
            }),
            None => Ok(TxStatus::default()),
        }
    }
}

/// XRP escrow owned by `owner`; times are offsets from now in seconds
pub fn escrow_object(
    owner: &str,
    destination: &str,
    drops: u64,
    finish_offset_secs: Option<i64>,
    cancel_offset_secs: Option<i64>,
) -> EscrowObject {
    let at = |offset: i64| to_ripple_time(Utc::now() + Duration::seconds(offset));

    EscrowObject {
        account: owner.to_string(),
        destination: destination.to_string(),
        amount: json!(drops.to_string()),
        finish_after: finish_offset_secs.map(at),
        cancel_after: cancel_offset_secs.map(at),
        previous_txn_id: Some("ABCDEF".to_string()),
        previous_txn_lgr_seq: Some(12_345),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Ledger config that polls fast and gives up quickly
pub fn fast_ledger_config() -> LedgerConfig {
    LedgerConfig {
        rpc_url: "http://127.0.0.1:1".to_string(),
        submit_timeout_secs: 1,
        poll_interval_ms: 5,
        last_ledger_offset: 5,
        ..LedgerConfig::default()
    }
}

pub fn gateway(ledger: Arc<MockLedger>) -> Arc<LedgerGateway> {
    Arc::new(LedgerGateway::new(ledger, fast_ledger_config()))
}

// ============================================================================
// Stores
// ============================================================================

/// Catalog whose every read fails like a lost database connection
pub struct FailingCatalog;

#[async_trait]
impl ProductCatalog for FailingCatalog {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        Err(RepositoryError::Query(sqlx::Error::PoolTimedOut))
    }

    async fn find_product(&self, _id: Uuid) -> RepositoryResult<Option<Product>> {
        Err(RepositoryError::Query(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_classic_address(&self, _classic_address: &str) -> RepositoryResult<Option<Product>> {
        Err(RepositoryError::Query(sqlx::Error::PoolTimedOut))
    }
}

pub fn product(name: &str, base_price: i64, classic_address: &str) -> Product {
    Product::new(
        name.to_string(),
        Some(format!("{} description", name)),
        base_price.into(),
        classic_address.to_string(),
    )
}

pub fn buyer_profile(id: Uuid) -> Profile {
    Profile {
        id,
        classic_address: Some(BUYER_ADDRESS.to_string()),
        public_key: None,
        private_key: None,
        seed: Some(ED25519_SEED.to_string()),
    }
}

/// Postgres stores for tests that opt in through `TEST_DATABASE_URL`
pub struct TestDatabase {
    pub pool: PgPool,
    pub products: ProductRepository,
    pub profiles: ProfileRepository,
    pub history: PriceHistoryRepository,
}

impl TestDatabase {
    /// `None` when no test database is configured
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;

        let config = DatabaseConfig {
            url,
            max_connections: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 600,
            test_before_acquire: true,
        };

        let pool = create_pool(&config)
            .await
            .expect("Failed to create test database pool");

        run_migrations(&pool, None)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            products: ProductRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            history: PriceHistoryRepository::new(pool.clone()),
            pool,
        })
    }

    pub async fn insert_product(&self, product: &Product) {
        sqlx::query(
            "INSERT INTO products (id, name, description, price, classic_address) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.classic_address)
        .execute(&self.pool)
        .await
        .expect("Failed to insert product");
    }

    pub async fn insert_profile(&self, profile: &Profile) {
        sqlx::query(
            "INSERT INTO profiles (id, classic_address, public_key, private_key, seed) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(profile.id)
        .bind(&profile.classic_address)
        .bind(&profile.public_key)
        .bind(&profile.private_key)
        .bind(&profile.seed)
        .execute(&self.pool)
        .await
        .expect("Failed to insert profile");
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Accepts exactly one token
pub struct StaticIdentity {
    pub user: AuthenticatedUser,
}

impl StaticIdentity {
    pub fn new(id: Uuid) -> Self {
        Self {
            user: AuthenticatedUser {
                id,
                email: Some("buyer@example.com".to_string()),
            },
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentity {
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        if token == VALID_TOKEN {
            Ok(self.user.clone())
        } else {
            Err(AppError::Unauthorized("Invalid token".to_string()))
        }
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Application wired to in-memory stores and a scripted ledger
pub struct TestApp {
    pub state: Arc<AppState>,
    pub catalog: Arc<InMemoryCatalog>,
    pub history: Arc<InMemoryPriceHistory>,
    pub ledger: Arc<MockLedger>,
    pub user_id: Uuid,
}

impl TestApp {
    pub fn new(ledger: MockLedger) -> Self {
        Self::with_escrow_config(ledger, EscrowConfig::default())
    }

    pub fn with_escrow_config(ledger: MockLedger, escrow: EscrowConfig) -> Self {
        Self::with_configs(ledger, fast_ledger_config(), escrow)
    }

    pub fn with_configs(ledger: MockLedger, ledger_config: LedgerConfig, escrow: EscrowConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let history = Arc::new(InMemoryPriceHistory::new());
        let ledger = Arc::new(ledger);
        let user_id = Uuid::new_v4();

        let stores = Stores {
            catalog: catalog.clone(),
            profiles: catalog.clone(),
            history: history.clone(),
        };

        let state = AppState::from_parts(
            stores,
            ledger.clone(),
            Arc::new(StaticIdentity::new(user_id)),
            ledger_config,
            PricingConfig::default(),
            escrow,
            PriceFeedConfig {
                geolocation_url: "http://127.0.0.1:1".to_string(),
                price_feed_url: "http://127.0.0.1:1".to_string(),
            },
        )
        .expect("Failed to build application state");

        Self {
            state: Arc::new(state),
            catalog,
            history,
            ledger,
            user_id,
        }
    }

    /// Register the authenticated user's profile
    pub async fn with_buyer(self) -> Self {
        self.catalog.insert_profile(buyer_profile(self.user_id)).await;
        self
    }
}
