use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    expired_cookie, hash_password, token_cookie, verify_password, AnyCustomer, Authorized,
    StaffManager, CUSTOMER_TOKEN_COOKIE, CUSTOMER_TOKEN_TTL_SECS,
};
use crate::db::{now, CustomerChanges, NewCustomer};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{
    CustomerLoginRequest, CustomerLoginResponse, RegisterCustomerRequest, UpdateCustomerRequest,
    UpdateProfileRequest,
};
use crate::pagination::ListQuery;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(register))
        .route("", web::get().to(list))
        .route("/login", web::post().to(login))
        .route("/search", web::get().to(search))
        .route("/profile", web::get().to(profile))
        .route("/profile/update", web::patch().to(update_profile))
        .route("/validate/{id}", web::put().to(validate_account))
        .route("/delete", web::delete().to(delete_self))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::put().to(update_by_id));
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterCustomerRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let email = present(body.email, "email")?.trim().to_string();
    let password = present(body.password, "password")?;
    let first_name = present(body.first_name, "first_name")?;
    let last_name = present(body.last_name, "last_name")?;

    let password_hash = web::block(move || hash_password(&password)).await??;
    let new = NewCustomer::register(first_name, last_name, email, password_hash);
    let customer = state.db(move |store| store.insert_customer(new)).await?;
    info!(customer_id = %customer.id, "customer registered");

    state.notifier.send_validation(&customer.email, customer.id);
    Ok(respond(
        StatusCode::CREATED,
        Some("Customer created successfully"),
        customer,
    ))
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<CustomerLoginRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let email = present(body.email, "email")?.trim().to_string();
    let password = present(body.password, "password")?;

    let lookup = email.clone();
    let Some(mut customer) = state
        .db(move |store| store.find_active_customer_by_email(&lookup))
        .await?
    else {
        warn!(%email, "customer login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let hash = customer.password_hash.clone();
    if !web::block(move || verify_password(&password, &hash)).await? {
        warn!(%email, "customer login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let at = now();
    let id = customer.id;
    state
        .db(move |store| store.record_customer_login(id, at))
        .await?;
    customer.last_login = Some(at);

    let token = state.tokens.issue_customer(&customer)?;
    info!(customer_id = %id, "customer logged in");
    Ok(HttpResponse::Ok()
        .cookie(token_cookie(
            CUSTOMER_TOKEN_COOKIE,
            token.clone(),
            CUSTOMER_TOKEN_TTL_SECS,
        ))
        .json(CustomerLoginResponse {
            message: "User logged in successfully",
            access_token: token,
            expires_in: "3 days",
            customer,
        }))
}

async fn list(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let customers = state
        .db(move |store| store.list_customers(None, page))
        .await?;
    Ok(ok(customers))
}

async fn search(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let term = query.search_term().map(str::to_string);
    let customers = state
        .db(move |store| store.list_customers(term.as_deref(), page))
        .await?;
    Ok(ok(customers))
}

async fn profile(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = auth.principal.require_customer()?;
    let customer = state
        .db(move |store| store.find_customer(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid Customer id".into()))?;
    Ok(ok(customer))
}

async fn update_profile(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
    body: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    let id = auth.principal.require_customer()?;
    let changes = validated(body)?.into_changes();
    if changes.is_empty() {
        return Err(ApiError::NoOpUpdate);
    }
    let customer = state
        .db(move |store| store.update_customer(id, changes))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid customer id".into()))?;
    Ok(respond(
        StatusCode::OK,
        Some("Your data updated successfully"),
        customer,
    ))
}

async fn validate_account(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let customer = state
        .db(move |store| store.find_customer(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid customer id".into()))?;
    if customer.valid_account {
        return Err(ApiError::BadRequest(
            "Invalid action, this email is already validated".into(),
        ));
    }

    let changes = CustomerChanges {
        valid_account: Some(true),
        ..CustomerChanges::default()
    };
    let customer = state
        .db(move |store| store.update_customer(id, changes))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid customer id".into()))?;
    info!(customer_id = %id, "customer account validated");
    Ok(respond(
        StatusCode::OK,
        Some("Customer's account validated successfully"),
        customer,
    ))
}

async fn delete_self(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let id = auth.principal.require_customer()?;
    if !state.db(move |store| store.delete_customer(id)).await? {
        return Err(ApiError::NotFound("Invalid Customer id".into()));
    }
    info!(customer_id = %id, "customer deleted their account");
    let mut response = respond(StatusCode::OK, Some("Customer deleted successfully"), ());
    response
        .add_cookie(&expired_cookie(CUSTOMER_TOKEN_COOKIE))
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(response)
}

async fn get_by_id(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let customer = state
        .db(move |store| store.find_customer(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Customer"))?;
    Ok(ok(customer))
}

async fn update_by_id(
    auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCustomerRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let changes = validated(body)?.into_changes();
    if changes.is_empty() {
        return Err(ApiError::NoOpUpdate);
    }
    let customer = state
        .db(move |store| store.update_customer(id, changes))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid customer id".into()))?;
    info!(customer_id = %id, by = ?auth.principal, "customer updated by staff");
    Ok(respond(
        StatusCode::OK,
        Some("Customer updated successfully"),
        customer,
    ))
}
