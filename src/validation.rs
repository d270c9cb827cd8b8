//! Cross-field rules used by the request types in [`crate::models`]. Each
//! function is wired in through `#[validate(schema(function = ...))]`, so
//! every request reports failures through the same `ValidationErrors` shape.

use std::borrow::Cow;

use validator::ValidationError;

use crate::db::{OrderStatus, Role};
use crate::models::{
    CreateListingRequest, CreateOrderRequest, CreateUserRequest, PaymentIntentRequest,
    RegisterCustomerRequest, UpdateListingRequest, UpdateUserRequest,
};

pub const PASSWORD_SPECIALS: &str = "@$!%*?&";
pub const PASSWORD_MIN_LEN: usize = 8;

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// At least eight characters drawn from letters, digits and
/// `@$!%*?&`, with at least one of each class.
pub fn is_strong_password(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);
    password.chars().count() >= PASSWORD_MIN_LEN
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

pub fn validate_registration(request: &RegisterCustomerRequest) -> Result<(), ValidationError> {
    match request.password.as_deref() {
        Some(password) if !is_strong_password(password) => Err(failure(
            "password_pattern",
            "Your password should match the suggested pattern",
        )),
        _ => Ok(()),
    }
}

fn price_for_active(active: Option<bool>, price: Option<f64>) -> Result<(), ValidationError> {
    if active == Some(true) && price.is_none() {
        return Err(failure(
            "price_required",
            "price is required when the listing is active",
        ));
    }
    Ok(())
}

pub fn validate_new_listing(request: &CreateListingRequest) -> Result<(), ValidationError> {
    price_for_active(request.active, request.price)
}

pub fn validate_listing_update(request: &UpdateListingRequest) -> Result<(), ValidationError> {
    price_for_active(request.active, request.price)
}

fn role_option(role: Option<&str>) -> Result<(), ValidationError> {
    match role {
        Some(role) if role.parse::<Role>().is_err() => Err(failure(
            "role",
            "Please choose a role option ( manager or admin )",
        )),
        _ => Ok(()),
    }
}

pub fn validate_new_user(request: &CreateUserRequest) -> Result<(), ValidationError> {
    role_option(request.role.as_deref())
}

pub fn validate_user_update(request: &UpdateUserRequest) -> Result<(), ValidationError> {
    role_option(request.role.as_deref())
}

pub fn validate_order_item(request: &CreateOrderRequest) -> Result<(), ValidationError> {
    match &request.order_item {
        Some(serde_json::Value::Object(_)) => Ok(()),
        _ => Err(failure("order_item", "The order items must be an object")),
    }
}

pub fn validate_payment_total(request: &PaymentIntentRequest) -> Result<(), ValidationError> {
    let total = request.items.as_ref().and_then(|items| items.total_with_fees);
    match total {
        Some(total) if total.is_finite() && total > 0.0 => Ok(()),
        _ => Err(failure(
            "total_with_fees",
            "items.total_with_fees must be a positive number",
        )),
    }
}

/// Parses a requested order status, reporting anything outside the four
/// known values as a validation failure.
pub fn parse_order_status(status: &str) -> Result<OrderStatus, ValidationError> {
    status.parse::<OrderStatus>().map_err(|_| {
        failure(
            "status",
            "status must be one of Pending, Paid, Closed, Canceled",
        )
    })
}
