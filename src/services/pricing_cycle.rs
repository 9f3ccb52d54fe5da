use crate::error::{AppError, AppResult};
use crate::ledger::LedgerGateway;
use crate::models::{PriceHistoryRecord, Product, ProductPriceSeries};
use crate::pricing::PricingEngine;
use crate::repositories::{PriceHistoryStore, ProductCatalog};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Recomputes prices from ledger demand and appends them to the history
pub struct PricingCycleService {
    catalog: Arc<dyn ProductCatalog>,
    history: Arc<dyn PriceHistoryStore>,
    gateway: Arc<LedgerGateway>,
    engine: PricingEngine,
}

impl PricingCycleService {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        history: Arc<dyn PriceHistoryStore>,
        gateway: Arc<LedgerGateway>,
        engine: PricingEngine,
    ) -> Self {
        Self {
            catalog,
            history,
            gateway,
            engine,
        }
    }

    /// Reprice every product; any catalog or store failure aborts the cycle
    pub async fn run_cycle(&self) -> AppResult<BTreeMap<String, ProductPriceSeries>> {
        let products = self.catalog.list_products().await.map_err(|e| {
            error!("Pricing cycle aborted, catalog unavailable: {}", e);
            AppError::from(e)
        })?;

        if products.is_empty() {
            return Err(AppError::NotFound("No products found".to_string()));
        }

        info!("Starting pricing cycle for {} product(s)", products.len());

        let mut result = BTreeMap::new();
        for product in &products {
            let series = self.reprice_product(product).await.map_err(|e| {
                error!("Pricing cycle aborted at product {}: {}", product.id, e);
                e
            })?;
            result.insert(product.id.to_string(), series);
        }

        info!("Pricing cycle complete");
        Ok(result)
    }

    /// Compute and append one record from the product's prior history.
    ///
    /// The store serializes the read and the append per product, so
    /// concurrent cycles never price from the same history twice.
    pub async fn reprice_product(&self, product: &Product) -> AppResult<ProductPriceSeries> {
        let demand = self.gateway.payment_count(&product.classic_address).await;
        let demand = i64::try_from(demand).unwrap_or(i64::MAX);

        let next = |history: &[PriceHistoryRecord]| {
            self.engine
                .compute_next_price(product, history, demand)
                .into_record(product.id)
        };
        let full_history = self.history.append_next(product.id, &next).await?;

        if let Some(latest) = full_history.last() {
            info!(
                "Product {}: demand={} supply={} momentum={} price={}",
                product.id, latest.demand_number, latest.supply_number, latest.momentum, latest.price
            );
        }

        Ok(ProductPriceSeries::from_records(
            &full_history,
            product.description.clone(),
            self.gateway.config().account_url(&product.classic_address),
        ))
    }

    /// Sorted history of one product
    pub async fn price_history(&self, product_id: Uuid) -> AppResult<Vec<PriceHistoryRecord>> {
        if self.catalog.find_product(product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Product {} not found", product_id)));
        }

        let history = self.history.fetch_sorted(product_id).await?;
        if history.is_empty() {
            return Err(AppError::NotFound(format!(
                "No price history for product {}",
                product_id
            )));
        }

        Ok(history)
    }
}
