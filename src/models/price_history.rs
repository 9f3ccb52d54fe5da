use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One point of a product's append-only price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Smallest currency unit (drops for purchases)
    pub price: i64,
    pub timestamp: DateTime<Utc>,
    pub demand_number: i64,
    pub supply_number: i64,
    pub momentum: i64,
    pub explanation: Vec<String>,
}

/// Record contents before the store assigns `id` and `timestamp`
#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceRecord {
    pub product_id: Uuid,
    pub price: i64,
    pub demand_number: i64,
    pub supply_number: i64,
    pub momentum: i64,
    pub explanation: Vec<String>,
}

impl NewPriceRecord {
    /// Stamp the record with a fresh id and the given insertion time
    pub fn into_record(self, timestamp: DateTime<Utc>) -> PriceHistoryRecord {
        PriceHistoryRecord {
            id: Uuid::new_v4(),
            product_id: self.product_id,
            price: self.price,
            timestamp,
            demand_number: self.demand_number,
            supply_number: self.supply_number,
            momentum: self.momentum,
            explanation: self.explanation,
        }
    }
}

/// Pricing-cycle output for one product
#[derive(Debug, Clone, Serialize)]
pub struct ProductPriceSeries {
    pub price_history: Vec<i64>,
    pub timestamp: Vec<DateTime<Utc>>,
    pub supply: Vec<i64>,
    pub demand: Vec<i64>,
    pub momentum: Vec<i64>,
    pub explanation: Vec<Vec<String>>,
    pub description: Option<String>,
    pub wallet_transaction_url: String,
}

impl ProductPriceSeries {
    /// Columnar view over records already sorted by timestamp
    pub fn from_records(
        records: &[PriceHistoryRecord],
        description: Option<String>,
        wallet_transaction_url: String,
    ) -> Self {
        Self {
            price_history: records.iter().map(|r| r.price).collect(),
            timestamp: records.iter().map(|r| r.timestamp).collect(),
            supply: records.iter().map(|r| r.supply_number).collect(),
            demand: records.iter().map(|r| r.demand_number).collect(),
            momentum: records.iter().map(|r| r.momentum).collect(),
            explanation: records.iter().map(|r| r.explanation.clone()).collect(),
            description,
            wallet_transaction_url,
        }
    }
}
