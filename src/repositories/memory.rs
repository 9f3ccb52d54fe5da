//! In-process store implementations for tests and local runs without
//! Postgres.

use super::{PriceHistoryStore, ProductCatalog, ProfileDirectory};
use crate::error::RepositoryResult;
use crate::models::{NewPriceRecord, PriceHistoryRecord, Product, Profile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Products and profiles held in memory
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
    profiles: RwLock<HashMap<Uuid, Profile>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.products.write().await.push(product);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn list_products(&self) -> RepositoryResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn find_product(&self, id: Uuid) -> RepositoryResult<Option<Product>> {
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_classic_address(&self, classic_address: &str) -> RepositoryResult<Option<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.classic_address == classic_address)
            .cloned())
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryCatalog {
    async fn find_profile(&self, user_id: Uuid) -> RepositoryResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}

/// Price history kept in insertion order
#[derive(Default)]
pub struct InMemoryPriceHistory {
    records: RwLock<Vec<PriceHistoryRecord>>,
}

impl InMemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record with an explicit timestamp, bypassing the clock
    pub async fn insert_at(&self, record: NewPriceRecord, timestamp: DateTime<Utc>) -> PriceHistoryRecord {
        let record = record.into_record(timestamp);
        self.records.write().await.push(record.clone());
        record
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

/// Sorted series of one product
fn series_of(records: &[PriceHistoryRecord], product_id: Uuid) -> Vec<PriceHistoryRecord> {
    let mut series: Vec<PriceHistoryRecord> = records
        .iter()
        .filter(|r| r.product_id == product_id)
        .cloned()
        .collect();

    // stable: equal timestamps stay in insertion order
    series.sort_by_key(|r| r.timestamp);
    series
}

/// Insertion time that keeps timestamps non-decreasing within a product
/// even if the clock steps back
fn next_timestamp(series: &[PriceHistoryRecord]) -> DateTime<Utc> {
    let now = Utc::now();
    series.iter().map(|r| r.timestamp).max().map_or(now, |floor| floor.max(now))
}

#[async_trait]
impl PriceHistoryStore for InMemoryPriceHistory {
    async fn append(&self, record: NewPriceRecord) -> RepositoryResult<PriceHistoryRecord> {
        let mut records = self.records.write().await;

        let timestamp = next_timestamp(&series_of(&records, record.product_id));
        let record = record.into_record(timestamp);
        records.push(record.clone());
        Ok(record)
    }

    async fn append_next(
        &self,
        product_id: Uuid,
        next: &(dyn for<'a> Fn(&'a [PriceHistoryRecord]) -> NewPriceRecord + Send + Sync),
    ) -> RepositoryResult<Vec<PriceHistoryRecord>> {
        let mut records = self.records.write().await;

        let mut series = series_of(&records, product_id);
        let record = next(&series[..]).into_record(next_timestamp(&series));
        records.push(record.clone());
        series.push(record);
        Ok(series)
    }

    async fn fetch_sorted(&self, product_id: Uuid) -> RepositoryResult<Vec<PriceHistoryRecord>> {
        Ok(series_of(&self.records.read().await, product_id))
    }

    async fn latest(&self, product_id: Uuid) -> RepositoryResult<Option<PriceHistoryRecord>> {
        Ok(self.fetch_sorted(product_id).await?.pop())
    }
}
