use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Price formula over the derived market inputs
pub trait PricingModel: Send + Sync {
    /// Momentum reported for the next record
    fn momentum(&self) -> i64;

    /// Next price in the smallest currency unit
    fn price(&self, base_price: Decimal, demand: i64, supply: i64, momentum: i64) -> i64;
}

/// `trunc(base + demand*10 + momentum*80 - supply*50)`
#[derive(Debug, Clone)]
pub struct LinearPricingModel {
    pub demand_weight: i64,
    pub momentum_weight: i64,
    pub supply_weight: i64,
    pub momentum: i64,
}

impl LinearPricingModel {
    pub fn new(momentum: i64) -> Self {
        Self {
            demand_weight: 10,
            momentum_weight: 80,
            supply_weight: -50,
            momentum,
        }
    }
}

impl Default for LinearPricingModel {
    fn default() -> Self {
        Self::new(3)
    }
}

impl PricingModel for LinearPricingModel {
    fn momentum(&self) -> i64 {
        self.momentum
    }

    fn price(&self, base_price: Decimal, demand: i64, supply: i64, momentum: i64) -> i64 {
        let raw = base_price
            + Decimal::from(demand.saturating_mul(self.demand_weight))
            + Decimal::from(momentum.saturating_mul(self.momentum_weight))
            + Decimal::from(supply.saturating_mul(self.supply_weight));

        // saturate instead of failing on absurd catalog prices
        raw.trunc().to_i64().unwrap_or(if raw.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}
