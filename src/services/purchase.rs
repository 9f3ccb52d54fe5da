use super::escrow_manager::EscrowManager;
use crate::error::{AppError, AppResult};
use crate::ledger::units::drops_to_xrp;
use crate::models::{EscrowReceipt, EscrowSettlement, EscrowView, Product, Wallet};
use crate::repositories::{PriceHistoryStore, ProductCatalog, ProfileDirectory};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Active escrow with the product it pays for, when known
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub escrow: EscrowView,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_price: Option<Decimal>,
}

impl OrderView {
    fn new(escrow: EscrowView, product: Option<Product>) -> Self {
        match product {
            Some(product) => Self {
                escrow,
                product_id: Some(product.id),
                product_name: Some(product.name),
                product_description: product.description,
                product_price: Some(product.price),
            },
            None => Self {
                escrow,
                product_id: None,
                product_name: None,
                product_description: None,
                product_price: None,
            },
        }
    }
}

/// Purchase flow on behalf of an authenticated user
pub struct PurchaseService {
    catalog: Arc<dyn ProductCatalog>,
    profiles: Arc<dyn ProfileDirectory>,
    history: Arc<dyn PriceHistoryStore>,
    escrows: Arc<EscrowManager>,
}

impl PurchaseService {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        profiles: Arc<dyn ProfileDirectory>,
        history: Arc<dyn PriceHistoryStore>,
        escrows: Arc<EscrowManager>,
    ) -> Self {
        Self {
            catalog,
            profiles,
            history,
            escrows,
        }
    }

    /// Escrow the current price of `product_id` from the user's wallet
    pub async fn buy(&self, user_id: Uuid, product_id: Uuid) -> AppResult<EscrowReceipt> {
        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;

        let buyer = self.user_wallet(user_id).await?;
        let seller = Wallet::watch_only(&product.classic_address)?;
        let amount = self.purchase_price(product.id).await?;

        info!(
            "User {} buying product {} for {} XRP",
            user_id, product.id, amount
        );

        self.escrows.create_escrow(&buyer, &seller, amount).await
    }

    /// Fixed price when configured, else the latest history price in drops
    pub async fn purchase_price(&self, product_id: Uuid) -> AppResult<Decimal> {
        if let Some(price) = self.escrows.config().fixed_price_xrp {
            return Ok(price);
        }

        let latest = self.history.latest(product_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("No price history for product {}", product_id))
        })?;

        match u64::try_from(latest.price) {
            Ok(drops) if drops > 0 => Ok(drops_to_xrp(drops)),
            _ => Err(AppError::InvalidArgument(format!(
                "Product {} has no purchasable price ({})",
                product_id, latest.price
            ))),
        }
    }

    /// Active escrows funded by the user, enriched with product data
    pub async fn orders(&self, user_id: Uuid) -> AppResult<Vec<OrderView>> {
        let buyer = self.user_wallet(user_id).await?;
        let escrows = self.escrows.list_escrows(buyer.classic_address()).await?;

        if escrows.is_empty() {
            return Err(AppError::NotFound("No active escrows".to_string()));
        }

        let mut orders = Vec::with_capacity(escrows.len());
        for escrow in escrows {
            let product = self.catalog.find_by_classic_address(&escrow.destination).await?;
            orders.push(OrderView::new(escrow, product));
        }

        Ok(orders)
    }

    pub async fn confirm_delivery(
        &self,
        user_id: Uuid,
        offer_sequence: Option<u32>,
    ) -> AppResult<EscrowSettlement> {
        let buyer = self.user_wallet(user_id).await?;
        self.escrows.finish_escrow(&buyer, offer_sequence).await
    }

    pub async fn fail_delivery(
        &self,
        user_id: Uuid,
        offer_sequence: Option<u32>,
    ) -> AppResult<EscrowSettlement> {
        let buyer = self.user_wallet(user_id).await?;
        self.escrows.cancel_escrow(&buyer, offer_sequence).await
    }

    async fn user_wallet(&self, user_id: Uuid) -> AppResult<Wallet> {
        let profile = self
            .profiles
            .find_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        Wallet::from_profile(&profile)
    }
}
