use super::explanation::explain_change;
use super::model::{LinearPricingModel, PricingModel};
use crate::config::PricingConfig;
use crate::models::{NewPriceRecord, PriceHistoryRecord, Product};
use std::sync::Arc;
use uuid::Uuid;

/// Output of one pricing step for a product
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub price: i64,
    pub demand: i64,
    pub supply: i64,
    pub momentum: i64,
    pub explanation: Vec<String>,
}

impl PriceQuote {
    pub fn into_record(self, product_id: Uuid) -> NewPriceRecord {
        NewPriceRecord {
            product_id,
            price: self.price,
            demand_number: self.demand,
            supply_number: self.supply,
            momentum: self.momentum,
            explanation: self.explanation,
        }
    }
}

/// Derives supply and momentum from history and applies the pricing model
#[derive(Clone)]
pub struct PricingEngine {
    model: Arc<dyn PricingModel>,
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(model: Arc<dyn PricingModel>, config: PricingConfig) -> Self {
        Self { model, config }
    }

    /// Engine with the linear model and the configured momentum
    pub fn linear(config: PricingConfig) -> Self {
        let model = Arc::new(LinearPricingModel::new(config.momentum));
        Self::new(model, config)
    }

    /// Supply baseline: the first record's supply, or the default when the
    /// product has no history. A zero baseline falls back.
    pub fn initial_supply(&self, history: &[PriceHistoryRecord]) -> i64 {
        match history.first() {
            Some(first) if first.supply_number != 0 => first.supply_number,
            Some(_) => self.config.fallback_initial_supply,
            None => self.config.default_initial_supply,
        }
    }

    /// Next price for `product` given its sorted `history` and observed `demand`
    pub fn compute_next_price(
        &self,
        product: &Product,
        history: &[PriceHistoryRecord],
        demand: i64,
    ) -> PriceQuote {
        let supply = (self.initial_supply(history) - demand).max(0);
        let momentum = self.model.momentum();
        let price = self.model.price(product.price, demand, supply, momentum);
        let explanation = explain_change(history.last(), price, demand, supply, momentum);

        PriceQuote {
            price,
            demand,
            supply,
            momentum,
            explanation,
        }
    }
}
