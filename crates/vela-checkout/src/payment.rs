//! # Payment Gateway
//!
//! Creates payment intents for card orders. The gateway is a black box: it
//! takes an amount and returns an intent id plus an opaque client secret the
//! storefront uses to confirm the payment.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Create Payment Intent                                │
//! │                                                                         │
//! │  CheckoutService                                                       │
//! │       │  create_intent(total, currency, {order_id, tracking_id})       │
//! │       ▼                                                                 │
//! │  HttpPaymentGateway                                                    │
//! │       │  POST {base_url}/v1/payment_intents                            │
//! │       │  Authorization: Basic <secret_key>:                            │
//! │       │  amount=2000&currency=usd&metadata[order_id]=...               │
//! │       ▼                                                                 │
//! │  2xx → PaymentIntent { id, client_secret }                             │
//! │  4xx → GatewayError::Rejected     (Forbidden)                          │
//! │  5xx / network → Transport        (InternalError)                      │
//! │  bad body → InvalidResponse       (InternalError)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::GatewaySettings;
use crate::error::{CheckoutError, CheckoutResult};

/// An intent created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the request (bad amount, declined account, ...).
    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The gateway could not be reached or failed on its side.
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The gateway answered with something that is not an intent.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// No gateway is configured.
    #[error("Card payments are not configured")]
    Disabled,
}

/// Creates payment intents.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// Stripe-compatible gateway over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        HttpPaymentGateway {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    /// Builds a gateway from settings. Requires a secret key.
    pub fn from_settings(settings: &GatewaySettings) -> CheckoutResult<Self> {
        let secret_key = settings
            .secret_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CheckoutError::InvalidConfig("gateway secret_key is not set".into()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CheckoutError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpPaymentGateway {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, metadata))]
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_lowercase()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        debug!(url = %self.intents_url(), "Creating payment intent");

        let response = self
            .client
            .post(self.intents_url())
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|env| env.error.message.or(env.error.code))
                .unwrap_or(body);
            warn!(status = status.as_u16(), message = %message, "Gateway rejected payment intent");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), "Gateway failed to create payment intent");
            return Err(GatewayError::Transport(format!(
                "gateway returned {}",
                status
            )));
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        info!(intent_id = %intent.id, "Payment intent created");
        Ok(intent)
    }
}

// =============================================================================
// Disabled Gateway
// =============================================================================

/// For cash-only deployments. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_intent(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, GatewayError> {
        Err(GatewayError::Disabled)
    }
}
