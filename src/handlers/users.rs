use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    hash_password, token_cookie, verify_password, Authorized, StaffAdmin, StaffManager,
    STAFF_TOKEN_COOKIE, STAFF_TOKEN_TTL_SECS,
};
use crate::db::{now, NewUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{CreateUserRequest, StaffLoginRequest, StaffLoginResponse, UpdateUserRequest};
use crate::pagination::ListQuery;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(login))
        .route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/search", web::get().to(search))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::delete().to(delete));
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<StaffLoginRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let user_name = present(body.user_name, "user_name")?;
    let password = present(body.password, "password")?;

    let lookup = user_name.clone();
    let Some(mut user) = state
        .db(move |store| store.find_active_user_by_user_name(&lookup))
        .await?
    else {
        warn!(%user_name, "staff login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let hash = user.password_hash.clone();
    if !web::block(move || verify_password(&password, &hash)).await? {
        warn!(%user_name, "staff login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let at = now();
    let id = user.id;
    state.db(move |store| store.record_user_login(id, at)).await?;
    user.last_login = Some(at);

    let token = state.tokens.issue_staff(id)?;
    info!(user_id = %id, role = %user.role, "staff user logged in");
    Ok(HttpResponse::Ok()
        .cookie(token_cookie(
            STAFF_TOKEN_COOKIE,
            token.clone(),
            STAFF_TOKEN_TTL_SECS,
        ))
        .json(StaffLoginResponse {
            message: "User logged in successfully",
            access_token: token,
            expires_in: "7 days",
            user,
        }))
}

async fn create(
    auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let role = present(body.role, "role")?
        .parse::<Role>()
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    let password = present(body.password, "password")?;
    let password_hash = web::block(move || hash_password(&password)).await??;

    let at = now();
    let new = NewUser {
        id: Uuid::new_v4(),
        first_name: present(body.first_name, "first_name")?,
        last_name: present(body.last_name, "last_name")?,
        email: present(body.email, "email")?.trim().to_string(),
        user_name: present(body.user_name, "user_name")?,
        password_hash,
        role,
        active: true,
        created_at: at,
        updated_at: at,
    };
    let user = state.db(move |store| store.insert_user(new)).await?;
    info!(user_id = %user.id, %role, by = ?auth.principal, "staff user created");
    Ok(respond(
        StatusCode::CREATED,
        Some("User created successfully"),
        user,
    ))
}

async fn list(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let users = state.db(move |store| store.list_users(None, page)).await?;
    Ok(ok(users))
}

async fn search(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let term = query.search_term().map(str::to_string);
    let users = state
        .db(move |store| store.list_users(term.as_deref(), page))
        .await?;
    Ok(ok(users))
}

async fn get_by_id(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let user = state
        .db(move |store| store.find_user(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ok(user))
}

async fn update(
    auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let changes = validated(body)?.into_changes();
    if changes.is_empty() {
        return Err(ApiError::NoOpUpdate);
    }
    let user = state
        .db(move |store| store.update_user(id, changes))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid user id".into()))?;
    info!(user_id = %id, by = ?auth.principal, "staff user updated");
    Ok(respond(
        StatusCode::OK,
        Some("User updated successfully"),
        user,
    ))
}

async fn delete(
    auth: Authorized<StaffAdmin>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let user = state
        .db(move |store| store.delete_user(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid user id".into()))?;
    info!(user_id = %id, by = ?auth.principal, "staff user deleted");
    Ok(respond(
        StatusCode::OK,
        Some("User deleted successfully"),
        user,
    ))
}
