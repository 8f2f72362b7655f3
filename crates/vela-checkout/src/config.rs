//! # Checkout Configuration
//!
//! Store, catalog, gateway and database settings for the checkout service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VELA_SHIPPING_FEE_CENTS=499                                        │
//! │     VELA_GATEWAY_SECRET_KEY=sk_live_...                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/vela-commerce/checkout.toml (Linux)                      │
//! │     ~/Library/Application Support/com.vela.commerce/checkout.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     USD, flat 5.00 shipping, 0 bps tax, 2500 combinations              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [store]
//! currency = "usd"
//! shipping_fee_cents = 500
//! free_shipping_threshold_cents = 10000
//! tax_rate_bps = 1700
//! accepted_payment_methods = ["card", "cash_on_delivery"]
//!
//! [catalog]
//! max_combinations = 2500
//!
//! [gateway]
//! base_url = "https://api.stripe.com"
//! secret_key = "sk_test_..."
//! timeout_secs = 10
//!
//! [database]
//! path = "vela.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CheckoutError, CheckoutResult};
use vela_core::validation::{validate_non_negative, validate_price_cents, validate_tax_rate_bps};
use vela_core::{Money, PaymentMethod, TaxRate, DEFAULT_MAX_COMBINATIONS};
use vela_db::DbConfig;

// =============================================================================
// Store Settings
// =============================================================================

/// Pricing rules applied to every order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// ISO 4217 currency code sent to the gateway (lower-case).
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Flat shipping fee per order.
    #[serde(default = "default_shipping_fee")]
    pub shipping_fee_cents: i64,

    /// Subtotal at or above which shipping is free. `None` disables.
    #[serde(default)]
    pub free_shipping_threshold_cents: Option<i64>,

    /// Tax contained in prices, in basis points (1700 = 17%).
    #[serde(default)]
    pub tax_rate_bps: u32,

    #[serde(default = "default_payment_methods")]
    pub accepted_payment_methods: Vec<PaymentMethod>,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_shipping_fee() -> i64 {
    500
}

fn default_payment_methods() -> Vec<PaymentMethod> {
    vec![PaymentMethod::Card, PaymentMethod::CashOnDelivery]
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            currency: default_currency(),
            shipping_fee_cents: default_shipping_fee(),
            free_shipping_threshold_cents: None,
            tax_rate_bps: 0,
            accepted_payment_methods: default_payment_methods(),
        }
    }
}

impl StoreSettings {
    /// Shipping fee for an order with this subtotal.
    pub fn shipping_fee_for(&self, subtotal: Money) -> Money {
        match self.free_shipping_threshold_cents {
            Some(threshold) if subtotal.cents() >= threshold => Money::zero(),
            _ => Money::from_cents(self.shipping_fee_cents),
        }
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.accepted_payment_methods.contains(&method)
    }
}

// =============================================================================
// Catalog Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Largest variant space a product may be expanded into.
    #[serde(default = "default_max_combinations")]
    pub max_combinations: u64,
}

fn default_max_combinations() -> u64 {
    DEFAULT_MAX_COMBINATIONS
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            max_combinations: default_max_combinations(),
        }
    }
}

// =============================================================================
// Gateway Settings
// =============================================================================

/// Card payment gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of a Stripe-compatible API.
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Secret API key. Card checkout is unavailable without one.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Upper bound on a single create-intent call.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            base_url: default_gateway_url(),
            secret_key: None,
            timeout_secs: default_gateway_timeout(),
        }
    }
}

impl GatewaySettings {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a checkout waits for the write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vela.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    /// Pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Main Checkout Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl CheckoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        let currency = &self.store.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidConfig(format!(
                "currency must be a 3-letter ISO code, got: {}",
                currency
            )));
        }

        validate_price_cents(self.store.shipping_fee_cents)?;
        if let Some(threshold) = self.store.free_shipping_threshold_cents {
            validate_non_negative("free_shipping_threshold_cents", threshold)?;
        }
        validate_tax_rate_bps(self.store.tax_rate_bps)?;

        if self.store.accepted_payment_methods.is_empty() {
            return Err(CheckoutError::InvalidConfig(
                "at least one payment method must be accepted".into(),
            ));
        }

        if self.catalog.max_combinations == 0 {
            return Err(CheckoutError::InvalidConfig(
                "max_combinations must be greater than 0".into(),
            ));
        }

        let base = url::Url::parse(&self.gateway.base_url)?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(CheckoutError::InvalidConfig(format!(
                "gateway base_url must be http(s), got: {}",
                self.gateway.base_url
            )));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(CheckoutError::InvalidConfig(
                "gateway timeout_secs must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(CheckoutError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VELA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(currency) = lookup("VELA_CURRENCY") {
            self.store.currency = currency.to_lowercase();
        }

        if let Some(fee) = lookup("VELA_SHIPPING_FEE_CENTS") {
            match fee.parse::<i64>() {
                Ok(cents) => self.store.shipping_fee_cents = cents,
                Err(_) => warn!(value = %fee, "Ignoring VELA_SHIPPING_FEE_CENTS"),
            }
        }

        if let Some(threshold) = lookup("VELA_FREE_SHIPPING_THRESHOLD_CENTS") {
            if threshold.is_empty() {
                self.store.free_shipping_threshold_cents = None;
            } else {
                match threshold.parse::<i64>() {
                    Ok(cents) => self.store.free_shipping_threshold_cents = Some(cents),
                    Err(_) => {
                        warn!(value = %threshold, "Ignoring VELA_FREE_SHIPPING_THRESHOLD_CENTS")
                    }
                }
            }
        }

        if let Some(bps) = lookup("VELA_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(rate) => self.store.tax_rate_bps = rate,
                Err(_) => warn!(value = %bps, "Ignoring VELA_TAX_RATE_BPS"),
            }
        }

        if let Some(max) = lookup("VELA_MAX_COMBINATIONS") {
            match max.parse::<u64>() {
                Ok(max) => self.catalog.max_combinations = max,
                Err(_) => warn!(value = %max, "Ignoring VELA_MAX_COMBINATIONS"),
            }
        }

        if let Some(url) = lookup("VELA_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.base_url = url;
        }

        if let Some(key) = lookup("VELA_GATEWAY_SECRET_KEY") {
            self.gateway.secret_key = Some(key);
        }

        if let Some(secs) = lookup("VELA_GATEWAY_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => self.gateway.timeout_secs = secs,
                Err(_) => warn!(value = %secs, "Ignoring VELA_GATEWAY_TIMEOUT_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vela", "commerce")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = CheckoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.currency, "usd");
        assert_eq!(config.catalog.max_combinations, 2_500);
        assert!(config.store.tax_rate().is_zero());
    }

    #[test]
    fn test_shipping_fee_threshold() {
        let mut store = StoreSettings::default();
        assert_eq!(store.shipping_fee_for(Money::from_cents(20_000)).cents(), 500);

        store.free_shipping_threshold_cents = Some(10_000);
        assert_eq!(store.shipping_fee_for(Money::from_cents(9_999)).cents(), 500);
        assert_eq!(store.shipping_fee_for(Money::from_cents(10_000)).cents(), 0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CheckoutConfig::default();
        config.store.currency = "dollars".into();
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.store.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.gateway.base_url = "ftp://gateway".into();
        assert!(config.validate().is_err());

        let mut config = CheckoutConfig::default();
        config.gateway.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(CheckoutError::InvalidConfig(_))
        ));

        let mut config = CheckoutConfig::default();
        config.store.accepted_payment_methods.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VELA_CURRENCY", "EUR"),
            ("VELA_SHIPPING_FEE_CENTS", "299"),
            ("VELA_FREE_SHIPPING_THRESHOLD_CENTS", "5000"),
            ("VELA_TAX_RATE_BPS", "not-a-number"),
            ("VELA_GATEWAY_SECRET_KEY", "sk_test_123"),
            ("VELA_GATEWAY_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = CheckoutConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.currency, "eur");
        assert_eq!(config.store.shipping_fee_cents, 299);
        assert_eq!(config.store.free_shipping_threshold_cents, Some(5_000));
        assert_eq!(config.store.tax_rate_bps, 0);
        assert_eq!(config.gateway.secret_key.as_deref(), Some("sk_test_123"));
        assert_eq!(config.gateway.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_from_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.toml");
        std::fs::write(
            &path,
            r#"
            [store]
            shipping_fee_cents = 750
            accepted_payment_methods = ["cash_on_delivery"]

            [catalog]
            max_combinations = 64
            "#,
        )
        .unwrap();

        let mut config: CheckoutConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.store.shipping_fee_cents, 750);
        assert!(!config.store.accepts(PaymentMethod::Card));
        assert_eq!(config.catalog.max_combinations, 64);
        assert_eq!(config.gateway.timeout_secs, 10);

        config.store.tax_rate_bps = 1_700;
        let saved = dir.path().join("nested").join("checkout.toml");
        config.save(Some(saved.clone())).unwrap();

        let contents = std::fs::read_to_string(&saved).unwrap();
        assert!(contents.contains("[store]"));
        assert!(contents.contains("tax_rate_bps = 1700"));
    }
}
