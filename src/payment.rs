use futures::future::LocalBoxFuture;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Settings;

pub const CURRENCY: &str = "mad";
pub const STATEMENT_DESCRIPTOR_SUFFIX: &str = "Payment using Stripe";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider is not configured")]
    NotConfigured,

    #[error("request to payment provider failed: {0}")]
    Request(String),

    #[error("payment provider answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected payment provider response: {0}")]
    Decode(String),
}

/// What the provider is asked to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentRequest {
    /// Minor currency units.
    pub amount: i64,
}

/// External payment-intent creation. The future is not `Send`; it runs on
/// the worker that handles the request.
pub trait PaymentGateway: Send + Sync {
    fn create_intent(&self, request: IntentRequest) -> LocalBoxFuture<'_, Result<String, PaymentError>>;
}

/// Converts a decimal total into minor units, truncating any fraction of a
/// minor unit.
pub fn amount_in_minor_units(total: f64) -> i64 {
    (total * 100.0).trunc() as i64
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    client_secret: String,
}

pub struct StripeGateway {
    secret_key: Option<String>,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.filter(|key| !key.trim().is_empty()),
            api_base: api_base.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.stripe_secret_key.clone(),
            settings.stripe_api_base.clone(),
        )
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base.trim_end_matches('/'))
    }
}

impl PaymentGateway for StripeGateway {
    fn create_intent(&self, request: IntentRequest) -> LocalBoxFuture<'_, Result<String, PaymentError>> {
        Box::pin(async move {
            let key = self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)?;
            let form = [
                ("amount", request.amount.to_string()),
                ("currency", CURRENCY.to_string()),
                (
                    "statement_descriptor_suffix",
                    STATEMENT_DESCRIPTOR_SUFFIX.to_string(),
                ),
                ("automatic_payment_methods[enabled]", "true".to_string()),
            ];

            let client = awc::Client::default();
            let mut response = client
                .post(self.intents_url())
                .bearer_auth(key)
                .send_form(&form)
                .await
                .map_err(|err| PaymentError::Request(err.to_string()))?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response
                    .body()
                    .await
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_default();
                error!(status, "payment intent rejected");
                return Err(PaymentError::Rejected { status, body });
            }

            let intent: PaymentIntent = response
                .json()
                .await
                .map_err(|err| PaymentError::Decode(err.to_string()))?;
            info!(intent = %intent.id, amount = request.amount, "payment intent created");
            Ok(intent.client_secret)
        })
    }
}
