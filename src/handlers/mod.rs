pub mod categories;
pub mod customers;
pub mod listings;
pub mod orders;
pub mod payments;
pub mod subcategories;
pub mod users;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::Serialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::ApiResponse;

pub(crate) fn respond<T: Serialize>(status: StatusCode, message: Option<&str>, data: T) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse::new(status.as_u16(), message, data))
}

pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    respond(StatusCode::OK, None, data)
}

/// Unwraps the JSON body and runs its declared validation rules.
pub(crate) fn validated<T: Validate>(body: web::Json<T>) -> ApiResult<T> {
    let body = body.into_inner();
    body.validate()?;
    Ok(body)
}

/// A field `validate` has already marked as required.
pub(crate) fn present<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}
