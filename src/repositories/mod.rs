//! Store access behind narrow traits so services can run against Postgres
//! or the in-memory implementations used in tests.

pub mod memory;
pub mod price_history_repository;
pub mod product_repository;
pub mod profile_repository;

pub use memory::{InMemoryCatalog, InMemoryPriceHistory};
pub use price_history_repository::PriceHistoryRepository;
pub use product_repository::ProductRepository;
pub use profile_repository::ProfileRepository;

use crate::error::RepositoryResult;
use crate::models::{NewPriceRecord, PriceHistoryRecord, Product, Profile};
use async_trait::async_trait;
use uuid::Uuid;

/// Read-only view of the product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>>;

    async fn find_product(&self, id: Uuid) -> RepositoryResult<Option<Product>>;

    /// Product whose receiving account is `classic_address`
    async fn find_by_classic_address(&self, classic_address: &str) -> RepositoryResult<Option<Product>>;
}

/// Stored user wallets
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> RepositoryResult<Option<Profile>>;
}

/// Append-only per-product price series
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    /// Persist a record, assigning its id and insertion timestamp
    async fn append(&self, record: NewPriceRecord) -> RepositoryResult<PriceHistoryRecord>;

    /// Read the sorted series, build the next record from it with `next` and
    /// append it, holding a per-product lock across both steps. Returns the
    /// series including the new record.
    async fn append_next(
        &self,
        product_id: Uuid,
        next: &(dyn for<'a> Fn(&'a [PriceHistoryRecord]) -> NewPriceRecord + Send + Sync),
    ) -> RepositoryResult<Vec<PriceHistoryRecord>>;

    /// Ascending by timestamp, ties in insertion order
    async fn fetch_sorted(&self, product_id: Uuid) -> RepositoryResult<Vec<PriceHistoryRecord>>;

    async fn latest(&self, product_id: Uuid) -> RepositoryResult<Option<PriceHistoryRecord>>;
}
