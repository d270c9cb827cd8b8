use actix_web::{web, HttpResponse};
use tracing::info;

use crate::auth::{AnyCustomer, Authorized};
use crate::error::{ApiError, ApiResult};
use crate::handlers::validated;
use crate::models::{PaymentIntentRequest, PaymentIntentResponse};
use crate::payment::{amount_in_minor_units, IntentRequest};
use crate::AppState;

/// Asks the payment provider for an intent covering the caller-supplied
/// total and hands its client secret back to the front end.
pub async fn create_payment_intent(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
    body: web::Json<PaymentIntentRequest>,
) -> ApiResult<HttpResponse> {
    let customer_id = auth.principal.require_customer()?;
    let total = validated(body)?
        .items
        .and_then(|items| items.total_with_fees)
        .ok_or_else(|| ApiError::Validation("items.total_with_fees is required".into()))?;
    let amount = amount_in_minor_units(total);
    if amount <= 0 {
        return Err(ApiError::Validation(
            "items.total_with_fees must be a positive number".into(),
        ));
    }

    let client_secret = state
        .payments
        .create_intent(IntentRequest { amount })
        .await?;
    info!(%customer_id, amount, "payment intent issued");
    Ok(HttpResponse::Ok().json(PaymentIntentResponse { client_secret }))
}
