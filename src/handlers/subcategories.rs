use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Authorized, StaffManager};
use crate::db::Subcategory;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{CreateSubcategoryRequest, SubcategoryDetail};
use crate::pagination::ListQuery;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/search", web::get().to(search))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::delete().to(delete));
}

async fn create(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    body: web::Json<CreateSubcategoryRequest>,
) -> ApiResult<HttpResponse> {
    let body = validated(body)?;
    let category_id = present(body.category_id, "category_id")?;
    if state
        .db(move |store| store.find_category(category_id))
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Category"));
    }

    let subcategory = Subcategory {
        id: Uuid::new_v4(),
        subcategory_name: present(body.subcategory_name, "subcategory_name")?,
        category_id,
        active: present(body.active, "active")?,
    };
    let subcategory = state
        .db(move |store| store.insert_subcategory(subcategory))
        .await?;
    info!(subcategory_id = %subcategory.id, %category_id, "subcategory created");
    Ok(respond(
        StatusCode::CREATED,
        Some("Subcategory created successfully"),
        subcategory,
    ))
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let subcategories = state
        .db(move |store| store.list_subcategories(None, page))
        .await?;
    Ok(ok(subcategories))
}

async fn search(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let term = query.search_term().map(str::to_string);
    let subcategories = state
        .db(move |store| store.list_subcategories(term.as_deref(), page))
        .await?;
    Ok(ok(subcategories))
}

async fn get_by_id(state: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let detail = state
        .db(move |store| {
            let Some(subcategory) = store.find_subcategory(id)? else {
                return Ok(None);
            };
            let category = store.find_category(subcategory.category_id)?;
            Ok(Some(SubcategoryDetail {
                subcategory,
                category,
            }))
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Subcategory"))?;
    Ok(ok(detail))
}

async fn delete(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    if state.db(move |store| store.subcategory_in_use(id)).await? {
        warn!(subcategory_id = %id, "refusing to delete a subcategory in use");
        return Err(ApiError::Conflict(
            "Subcategory has attached listings and cannot be deleted".into(),
        ));
    }
    if !state.db(move |store| store.delete_subcategory(id)).await? {
        return Err(ApiError::not_found("Subcategory"));
    }
    info!(subcategory_id = %id, "subcategory deleted");
    Ok(respond(
        StatusCode::OK,
        Some("Subcategory deleted successfully"),
        (),
    ))
}
