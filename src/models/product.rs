use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog product with the ledger account that receives its payments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal, // NUMERIC(20, 6) in database
    pub classic_address: String,
}

impl Product {
    pub fn new(name: String, description: Option<String>, price: Decimal, classic_address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            classic_address,
        }
    }

    /// Base price with the fractional part dropped
    pub fn base_price(&self) -> i64 {
        self.price.trunc().to_i64().unwrap_or(0)
    }
}
