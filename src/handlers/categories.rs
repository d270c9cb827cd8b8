use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::info;
use uuid::Uuid;

use crate::auth::{Authorized, StaffManager};
use crate::db::{now, NewCategory};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::pagination::ListQuery;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/search", web::get().to(search))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::put().to(update))
        .route("/{id}", web::delete().to(delete));
}

async fn create(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    body: web::Json<CreateCategoryRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let category_name = present(body.category_name, "category_name")?;

    let lookup = category_name.clone();
    if state
        .db(move |store| store.find_category_by_name(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "The category {category_name} already exists"
        )));
    }

    let at = now();
    let new = NewCategory {
        id: Uuid::new_v4(),
        category_name,
        category_icon: present(body.category_icon, "category_icon")?,
        active: present(body.active, "active")?,
        created_at: at,
        updated_at: at,
    };
    let category = state.db(move |store| store.insert_category(new)).await?;
    info!(category_id = %category.id, name = %category.category_name, "category created");
    Ok(respond(
        StatusCode::CREATED,
        Some("Category created successfully"),
        category,
    ))
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let categories = state
        .db(move |store| store.list_categories(None, page))
        .await?;
    Ok(ok(categories))
}

async fn search(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let term = query.search_term().map(str::to_string);
    let categories = state
        .db(move |store| store.list_categories(term.as_deref(), page))
        .await?;
    Ok(ok(categories))
}

async fn get_by_id(state: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let category = state
        .db(move |store| store.find_category(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    Ok(ok(category))
}

async fn update(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCategoryRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let changes = validated(body)?.into_changes();
    if changes.is_empty() {
        return Err(ApiError::NoOpUpdate);
    }

    let current = state
        .db(move |store| store.find_category(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Category Not Found (Invalid ID)".into()))?;
    if changes.matches(&current) {
        return Err(ApiError::NoOpUpdate);
    }

    if let Some(name) = changes.category_name.clone() {
        if name != current.category_name {
            let lookup = name.clone();
            if state
                .db(move |store| store.find_category_by_name(&lookup))
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict(format!(
                    "The category {name} already exists"
                )));
            }
        }
    }

    let category = state
        .db(move |store| store.update_category(id, changes))
        .await?
        .ok_or_else(|| ApiError::NotFound("Category Not Found (Invalid ID)".into()))?;
    info!(category_id = %id, "category updated");
    Ok(respond(
        StatusCode::OK,
        Some("Category updated successfully"),
        category,
    ))
}

async fn delete(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let category = state
        .db(move |store| store.delete_category(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    info!(category_id = %id, "category deleted");
    Ok(respond(
        StatusCode::OK,
        Some("Category deleted successfully"),
        category,
    ))
}
