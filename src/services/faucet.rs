use crate::error::{AppError, AppResult};
use crate::ledger::{Keypair, LedgerGateway};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Freshly generated testnet wallet, funded by the faucet
#[derive(Clone, Serialize)]
pub struct FaucetWallet {
    pub classic_address: String,
    pub public_key: String,
    pub private_key: String,
    pub seed: String,
    pub balance_xrp: Decimal,
}

impl fmt::Debug for FaucetWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetWallet")
            .field("classic_address", &self.classic_address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("seed", &"<redacted>")
            .field("balance_xrp", &self.balance_xrp)
            .finish()
    }
}

/// Faucet versions differ in which of these keys they fill
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaucetAccount {
    classic_address: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
struct FaucetResponse {
    #[serde(default)]
    account: Option<FaucetAccount>,
}

impl FaucetResponse {
    fn funded_address(&self) -> Option<&str> {
        self.account
            .as_ref()
            .and_then(|a| a.classic_address.as_deref().or(a.address.as_deref()))
    }
}

/// Testnet faucet client.
///
/// Keys are generated here; the faucet only learns the address to fund.
pub struct FaucetClient {
    http: reqwest::Client,
    gateway: Arc<LedgerGateway>,
}

impl FaucetClient {
    pub fn new(gateway: Arc<LedgerGateway>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build faucet HTTP client: {}", e)))?;

        Ok(Self { http, gateway })
    }

    /// Generate a keypair, have the faucet fund its address and wait until
    /// the account shows a balance
    pub async fn create_wallet(&self) -> AppResult<FaucetWallet> {
        let (seed, keypair) = Keypair::generate().map_err(AppError::Message)?;
        let classic_address = keypair.classic_address();

        let response: FaucetResponse = self
            .http
            .post(&self.gateway.config().faucet_url)
            .json(&json!({ "destination": classic_address, "userAgent": "xstreet-backend" }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::NetworkFailure(format!("faucet: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::NetworkFailure(format!("faucet response: {}", e)))?;

        if let Some(funded) = response.funded_address() {
            if funded != classic_address {
                return Err(AppError::NetworkFailure(format!(
                    "faucet funded {} instead of {}",
                    funded, classic_address
                )));
            }
        }

        let balance_xrp = self.wait_for_funding(&classic_address).await?;
        info!("Faucet funded {} with {} XRP", classic_address, balance_xrp);

        Ok(FaucetWallet {
            classic_address,
            public_key: keypair.public_key_hex(),
            private_key: keypair.private_key_hex(),
            seed,
            balance_xrp,
        })
    }

    /// Poll the validated ledger until `address` exists with a balance
    async fn wait_for_funding(&self, address: &str) -> AppResult<Decimal> {
        let config = self.gateway.config();
        let deadline = Instant::now() + config.submit_timeout();

        loop {
            match self.gateway.account_balance(address).await {
                Ok(balance) if balance > Decimal::ZERO => return Ok(balance),
                Ok(_) => debug!("{} exists but is not funded yet", address),
                Err(e) if e.is_not_found() => debug!("{} not on a validated ledger yet", address),
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(AppError::NetworkFailure(format!(
                    "faucet funding of {} not validated within {}s",
                    address, config.submit_timeout_secs
                )));
            }

            sleep(config.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_funded_address_reads_either_key() {
        let response: FaucetResponse = serde_json::from_value(json!({
            "account": {
                "xAddress": "T7...",
                "classicAddress": "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW",
                "address": "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW"
            },
            "amount": 100
        }))
        .unwrap();
        assert_eq!(response.funded_address(), Some("rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW"));

        let legacy: FaucetResponse =
            serde_json::from_value(json!({ "account": { "address": "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW" } })).unwrap();
        assert_eq!(legacy.funded_address(), Some("rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW"));

        let bare: FaucetResponse = serde_json::from_value(json!({ "amount": 100 })).unwrap();
        assert_eq!(bare.funded_address(), None);
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let wallet = FaucetWallet {
            classic_address: "rGMTQpyhaDwWTqmw4dcYHj5NPJhtWNhtRW".into(),
            public_key: "ED951BF8B3B7C8AA4BC1B91790FC1B3FF7155CD729C2E6F038A93F5F3B9035DD85".into(),
            private_key: "EDDAA295BEED4E2EE94C24015B56AF626B4F21EF9F44F2B3D40FC41C90900A6BF1".into(),
            seed: "sEdSJHdnVumf99WfaHTnU8DaQkx5Q4n".into(),
            balance_xrp: Decimal::from(100),
        };

        let rendered = format!("{:?}", wallet);
        assert!(!rendered.contains("sEdSJ"));
        assert!(!rendered.contains("DAA295"));
    }
}
