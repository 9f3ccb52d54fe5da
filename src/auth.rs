//! Bearer-token verification against the identity provider.

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identity resolved from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves a bearer token to a user or fails with Unauthorized
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> AppResult<&str> {
    let header = header.ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Malformed authorization header".to_string()))
}

/// Supabase Auth: `GET {url}/auth/v1/user`
pub struct SupabaseAuth {
    http: reqwest::Client,
    config: AuthConfig,
}

impl SupabaseAuth {
    pub fn new(config: AuthConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build auth HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.config.supabase_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseAuth {
    async fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let response = self
            .http
            .get(self.user_url())
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::NetworkFailure(format!("identity provider: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                debug!("Identity provider rejected token");
                return Err(AppError::Unauthorized("Invalid token".to_string()));
            }
            status => {
                warn!("Identity provider answered HTTP {}", status);
                return Err(AppError::NetworkFailure(format!(
                    "identity provider answered HTTP {}",
                    status
                )));
            }
        }

        response
            .json::<AuthenticatedUser>()
            .await
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}
