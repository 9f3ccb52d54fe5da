use crate::config::PriceFeedConfig;
use crate::error::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_COUNTRY: &str = "US";
const DEFAULT_CURRENCY: &str = "USD";

/// Local currency for a two-letter country code
pub fn currency_for_country(country_code: &str) -> &'static str {
    match country_code.to_ascii_uppercase().as_str() {
        "SG" => "SGD",
        "US" => "USD",
        "IN" => "INR",
        "MY" => "MYR",
        "PH" => "PHP",
        "ID" => "IDR",
        "CN" => "CNY",
        "JP" => "JPY",
        "GB" => "GBP",
        "EU" => "EUR",
        "NG" => "NGN",
        "KE" => "KES",
        "MX" => "MXN",
        "CA" => "CAD",
        "AU" => "AUD",
        _ => DEFAULT_CURRENCY,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub city: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub xrp_price: Decimal,
    pub converted_price: Decimal,
    pub local_currency: String,
    pub conversion_rate: Decimal,
    pub location: Location,
}

/// Converts XRP amounts into the caller's local currency
pub struct CurrencyConverter {
    http: reqwest::Client,
    config: PriceFeedConfig,
}

impl CurrencyConverter {
    pub fn new(config: PriceFeedConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build price feed HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub async fn convert(&self, xrp_price: Decimal, client_ip: Option<IpAddr>) -> AppResult<Conversion> {
        if xrp_price <= Decimal::ZERO {
            return Err(AppError::InvalidArgument(
                "Invalid XRP price. Must be > 0.".to_string(),
            ));
        }

        let location = self.locate(client_ip).await;
        let currency = currency_for_country(&location.country_code);
        let rate = self.xrp_rate(currency).await?;

        Ok(Conversion {
            xrp_price,
            converted_price: (xrp_price * rate).round_dp(4),
            local_currency: currency.to_string(),
            conversion_rate: rate,
            location,
        })
    }

    /// Geolocate the caller; lookup failures fall back to the default country
    async fn locate(&self, client_ip: Option<IpAddr>) -> Location {
        let base = self.config.geolocation_url.trim_end_matches('/');
        let url = match client_ip {
            Some(ip) if is_public(&ip) => format!("{}/{}/json", base, ip),
            _ => format!("{}/json", base),
        };

        let body = match self.get_json(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Geolocation lookup failed, assuming {}: {}", DEFAULT_COUNTRY, e);
                Value::Null
            }
        };

        parse_location(&body)
    }

    async fn xrp_rate(&self, currency: &str) -> AppResult<Decimal> {
        let vs = currency.to_ascii_lowercase();
        let body = self
            .http
            .get(&self.config.price_feed_url)
            .query(&[("ids", "ripple"), ("vs_currencies", vs.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::NetworkFailure(format!("price feed: {}", e)))?
            .json::<Value>()
            .await
            .map_err(|e| AppError::NetworkFailure(format!("price feed: {}", e)))?;

        debug!("Price feed answered for {}", currency);
        parse_rate(&body, &vs).ok_or_else(|| {
            AppError::ExternalRateUnavailable(format!("No conversion rate for currency: {}", currency))
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, reqwest::Error> {
        self.http.get(url).send().await?.error_for_status()?.json().await
    }
}

fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => !(v4.is_loopback() || v4.is_private() || v4.is_unspecified()),
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified()),
    }
}

fn parse_location(body: &Value) -> Location {
    let field = |key: &str, default: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    Location {
        city: field("city", "Unknown"),
        country_code: field("country", DEFAULT_COUNTRY),
    }
}

fn parse_rate(body: &Value, vs_currency: &str) -> Option<Decimal> {
    let raw = body.get("ripple")?.get(vs_currency)?;
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .filter(|rate| *rate > Decimal::ZERO)
}
