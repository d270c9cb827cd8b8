use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::auth::token::TokenError;
use crate::db::StoreError;
use crate::payment::PaymentError;

/// Every failure a handler can surface. Each variant owns exactly one status
/// code, so a logical error kind renders the same way on every route.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Nothing to update. Enter the fields you want to update.")]
    NoOpUpdate,

    #[error("{0}")]
    BadRequest(String),

    #[error("No Token Provided")]
    Unauthenticated,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid Credentials")]
    InvalidCredentials,

    #[error("Invalid Token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("payment provider failure: {0}")]
    Payment(#[from] PaymentError),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("token signing failed: {0}")]
    Token(#[from] TokenError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("You don't have enough privilege".to_string())
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Payment(_) => "Payment provider unavailable".to_string(),
            ApiError::Store(_)
            | ApiError::Token(_)
            | ApiError::Hash(_)
            | ApiError::Blocking(_)
            | ApiError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => ApiError::Conflict(conflict_message(&constraint)),
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            other => ApiError::Store(other),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages(None, &errors, &mut messages);
        messages.sort();
        ApiError::Validation(messages.join("; "))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::NoOpUpdate | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated | ApiError::Unauthorized | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InvalidToken | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(_)
            | ApiError::Token(_)
            | ApiError::Hash(_)
            | ApiError::Blocking(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        HttpResponse::build(status).json(json!({
            "status": status.as_u16(),
            "success": false,
            "message": self.public_message(),
        }))
    }
}

fn collect_messages(prefix: Option<&str>, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None if path == "__all__" => error.code.to_string(),
                        None => format!("{path} is invalid ({})", error.code),
                    };
                    out.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(Some(&path), nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(Some(&format!("{path}[{index}]")), nested, out);
                }
            }
        }
    }
}

/// Maps unique-constraint names to the message clients see on a duplicate.
fn conflict_message(constraint: &str) -> String {
    match constraint {
        "customers_email_key" => "Email already registered",
        "users_email_key" | "users_user_name_key" => "User already exists",
        "categories_category_name_key" => "The category already exists",
        "subcategories_subcategory_name_key" => "The subcategory already exists",
        "listings_listing_name_key" => "The listing title should be unique",
        "listings_subcategory_id_fkey" => "Subcategory has attached listings and cannot be deleted",
        _ => "Resource already exists",
    }
    .to_string()
}
