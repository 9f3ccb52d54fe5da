use super::extract::{AuthUser, ClientIp};
use crate::error::{AppError, AppResult};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

type ApiResult = AppResult<Json<Value>>;

/// GET /
pub async fn home() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Welcome to the xStreet API",
    }))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (database, pool) = match &state.database {
        Some(db) => match db.ping().await {
            Ok(()) => ("ok", Some(db.status())),
            Err(e) => {
                warn!("Health check: {}", e);
                ("unavailable", None)
            }
        },
        None => ("disabled", None),
    };

    Json(json!({
        "status": "ok",
        "service": "xstreet-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "pool": pool,
    }))
}

/// POST /create_wallet
pub async fn create_wallet(State(state): State<Arc<AppState>>) -> ApiResult {
    let wallet = state.faucet.create_wallet().await?;
    Ok(Json(json!({ "status": "success", "wallet": wallet })))
}

/// POST /update_price
pub async fn update_price(State(state): State<Arc<AppState>>) -> ApiResult {
    let series = state.pricing.run_cycle().await?;
    Ok(Json(serde_json::to_value(series)?))
}

/// GET /products/{id}/price_history
pub async fn price_history(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> ApiResult {
    let product_id = parse_uuid(&product_id)?;
    let history = state.pricing.price_history(product_id).await?;
    Ok(Json(json!({ "product_id": product_id, "history": history })))
}

/// POST /buy/{product_id}
pub async fn buy(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> ApiResult {
    let product_id = parse_uuid(&product_id)?;
    let receipt = state.purchases.buy(user.id, product_id).await?;
    Ok(Json(serde_json::to_value(receipt)?))
}

/// GET /orders_escrows
pub async fn orders(State(state): State<Arc<AppState>>, AuthUser(user): AuthUser) -> ApiResult {
    let orders = state.purchases.orders(user.id).await?;
    Ok(Json(serde_json::to_value(orders)?))
}

/// POST /order_delivery_confirmation/{offer_sequence}
pub async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(offer_sequence): Path<String>,
) -> ApiResult {
    let offer_sequence = parse_sequence(&offer_sequence)?;
    let settlement = state.purchases.confirm_delivery(user.id, offer_sequence).await?;
    Ok(Json(serde_json::to_value(settlement)?))
}

/// POST /order_delivery_failed/{offer_sequence}
pub async fn fail_delivery(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(offer_sequence): Path<String>,
) -> ApiResult {
    let offer_sequence = parse_sequence(&offer_sequence)?;
    let settlement = state.purchases.fail_delivery(user.id, offer_sequence).await?;
    Ok(Json(serde_json::to_value(settlement)?))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub xrp_price: Decimal,
}

/// POST /convert_xrp_auto
pub async fn convert_xrp(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload
        .map_err(|e| AppError::InvalidArgument(format!("Invalid request body: {}", e.body_text())))?;

    let conversion = state.converter.convert(request.xrp_price, client_ip).await?;

    let mut body = serde_json::to_value(conversion)?;
    body["status"] = json!("success");
    Ok(Json(body))
}

fn parse_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidArgument(format!("Invalid product id: {}", raw)))
}

/// Clients send `null`/`undefined` when they lost the sequence
fn parse_sequence(raw: &str) -> AppResult<Option<u32>> {
    match raw.trim() {
        "" | "null" | "undefined" | "None" => Ok(None),
        value => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::InvalidArgument(format!("Invalid offer sequence: {}", raw))),
    }
}
