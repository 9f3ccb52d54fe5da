use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Read an environment variable and parse it, falling back to `default`
/// when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> Result<String, String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("{} environment variable is required", key))
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env_required("DATABASE_URL")?;

        let config = Self {
            url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 30),
            idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT_SECS", 600), // 10 minutes
            max_lifetime_secs: env_or("DATABASE_MAX_LIFETIME_SECS", 1800), // 30 minutes
            test_before_acquire: env_or("DATABASE_TEST_BEFORE_ACQUIRE", true),
        };

        if config.max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if config.acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(config)
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/xstreet".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

/// XRP Ledger node and transaction policy
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub request_timeout_secs: u64,
    /// `limit` used for paginated `account_tx` / `account_objects` queries
    pub page_size: u32,
    /// Attempts for read-only queries; submissions are never retried
    pub max_retries: usize,
    pub submit_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Ledgers after the current one a transaction may still be included in
    pub last_ledger_offset: u32,
    /// Highest transaction cost accepted when autofilling `Fee`
    pub max_fee_drops: u64,
    pub explorer_url: String,
    pub faucet_url: String,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, String> {
        let config = Self {
            rpc_url: env_string("XRPL_RPC_URL", "https://s.altnet.rippletest.net:51234"),
            request_timeout_secs: env_or("XRPL_REQUEST_TIMEOUT_SECS", 15),
            page_size: env_or("XRPL_PAGE_SIZE", 100),
            max_retries: env_or("XRPL_MAX_RETRIES", 3),
            submit_timeout_secs: env_or("XRPL_SUBMIT_TIMEOUT_SECS", 60),
            poll_interval_ms: env_or("XRPL_POLL_INTERVAL_MS", 1000),
            last_ledger_offset: env_or("XRPL_LAST_LEDGER_OFFSET", 20),
            max_fee_drops: env_or("XRPL_MAX_FEE_DROPS", 2_000_000),
            explorer_url: env_string("XRPL_EXPLORER_URL", "https://testnet.xrpl.org"),
            faucet_url: env_string(
                "XRPL_FAUCET_URL",
                "https://faucet.altnet.rippletest.net/accounts",
            ),
        };

        if config.page_size == 0 {
            return Err("XRPL_PAGE_SIZE must be greater than 0".to_string());
        }

        if config.last_ledger_offset == 0 {
            return Err("XRPL_LAST_LEDGER_OFFSET must be greater than 0".to_string());
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Explorer page for an account
    pub fn account_url(&self, classic_address: &str) -> String {
        format!(
            "{}/accounts/{}",
            self.explorer_url.trim_end_matches('/'),
            classic_address
        )
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://s.altnet.rippletest.net:51234".to_string(),
            request_timeout_secs: 15,
            page_size: 100,
            max_retries: 3,
            submit_timeout_secs: 60,
            poll_interval_ms: 1000,
            last_ledger_offset: 20,
            max_fee_drops: 2_000_000,
            explorer_url: "https://testnet.xrpl.org".to_string(),
            faucet_url: "https://faucet.altnet.rippletest.net/accounts".to_string(),
        }
    }
}

/// Pricing model parameters
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Initial supply for products without history
    pub default_initial_supply: i64,
    /// Substitute when the first record carries a zero supply
    pub fallback_initial_supply: i64,
    pub momentum: i64,
}

impl PricingConfig {
    pub fn from_env() -> Self {
        Self {
            default_initial_supply: env_or("PRICING_DEFAULT_SUPPLY", 1000),
            fallback_initial_supply: env_or("PRICING_FALLBACK_SUPPLY", 50),
            momentum: env_or("PRICING_MOMENTUM", 3),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_initial_supply: 1000,
            fallback_initial_supply: 50,
            momentum: 3,
        }
    }
}

/// Escrow creation policy
#[derive(Debug, Clone)]
pub struct EscrowConfig {
    /// XRP held back on top of the escrow amount to cover fees
    pub fee_buffer_xrp: Decimal,
    pub finish_after_secs: u32,
    /// Seconds after `finish_after` at which the buyer may cancel
    pub cancel_window_secs: u32,
    /// Overrides the history price for purchases when set
    pub fixed_price_xrp: Option<Decimal>,
}

impl EscrowConfig {
    pub fn from_env() -> Result<Self, String> {
        let fixed_price_xrp = match env::var("ESCROW_FIXED_PRICE_XRP") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                Decimal::from_str(raw.trim())
                    .map_err(|e| format!("Invalid ESCROW_FIXED_PRICE_XRP: {}", e))?,
            ),
            _ => None,
        };

        let config = Self {
            fee_buffer_xrp: env_or("ESCROW_FEE_BUFFER_XRP", Decimal::ONE),
            finish_after_secs: env_or("ESCROW_FINISH_AFTER_SECS", 100),
            cancel_window_secs: env_or("ESCROW_CANCEL_WINDOW_SECS", 86_400),
            fixed_price_xrp,
        };

        if config.fee_buffer_xrp.is_sign_negative() {
            return Err("ESCROW_FEE_BUFFER_XRP must not be negative".to_string());
        }

        if config.cancel_window_secs == 0 {
            return Err("ESCROW_CANCEL_WINDOW_SECS must be greater than 0".to_string());
        }

        if let Some(price) = config.fixed_price_xrp {
            if price <= Decimal::ZERO {
                return Err("ESCROW_FIXED_PRICE_XRP must be positive".to_string());
            }
        }

        Ok(config)
    }
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            fee_buffer_xrp: Decimal::ONE,
            finish_after_secs: 100,
            cancel_window_secs: 86_400,
            fixed_price_xrp: None,
        }
    }
}

/// Identity provider used to verify bearer tokens
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            supabase_url: env_required("SUPABASE_URL")?,
            supabase_anon_key: env_required("SUPABASE_ANON_KEY")?,
        })
    }
}

/// Third-party lookups used for currency conversion
#[derive(Debug, Clone)]
pub struct PriceFeedConfig {
    pub geolocation_url: String,
    pub price_feed_url: String,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            geolocation_url: "https://ipinfo.io".to_string(),
            price_feed_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
        }
    }
}

impl PriceFeedConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            geolocation_url: env_string("GEOLOCATION_URL", &defaults.geolocation_url),
            price_feed_url: env_string("PRICE_FEED_URL", &defaults.price_feed_url),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub pricing: PricingConfig,
    pub escrow: EscrowConfig,
    pub auth: AuthConfig,
    pub price_feed: PriceFeedConfig,
    pub http_port: u16,
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub log_format: String,
    pub environment: String,
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let ledger = LedgerConfig::from_env()?;
        let escrow = EscrowConfig::from_env()?;
        let auth = AuthConfig::from_env()?;

        let log_level = env_string("LOG_LEVEL", "info").to_lowercase();
        let log_format = env_string("LOG_FORMAT", "text").to_lowercase();
        let environment = env_string("ENVIRONMENT", "development").to_lowercase();

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&log_format.as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_formats
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            ledger,
            pricing: PricingConfig::from_env(),
            escrow,
            auth,
            price_feed: PriceFeedConfig::from_env(),
            http_port: env_or("HTTP_PORT", 8000),
            allowed_origins: parse_origins(&env_string(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:8080",
            )),
            log_level,
            log_format,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Production always logs JSON
    pub fn json_logs(&self) -> bool {
        self.log_format == "json" || self.is_production()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
