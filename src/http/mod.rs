//! HTTP surface: routes, auth extraction and error rendering.

mod error;
mod extract;
mod handlers;

pub use extract::{AuthUser, ClientIp};

use crate::AppState;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// CORS for the configured front-end origins
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/create_wallet", post(handlers::create_wallet))
        .route("/update_price", post(handlers::update_price))
        .route("/products/{id}/price_history", get(handlers::price_history))
        .route("/buy/{product_id}", post(handlers::buy))
        .route("/orders_escrows", get(handlers::orders))
        .route(
            "/order_delivery_confirmation/{offer_sequence}",
            post(handlers::confirm_delivery),
        )
        .route(
            "/order_delivery_failed/{offer_sequence}",
            post(handlers::fail_delivery),
        )
        .route("/convert_xrp_auto", post(handlers::convert_xrp))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
