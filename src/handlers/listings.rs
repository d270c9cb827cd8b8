use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AnyCustomer, Authorized, OwnerOrStaff};
use crate::db::{now, Listing, NewListing, Store, StoreResult};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{CreateListingRequest, ListingDetail, UpdateListingRequest};
use crate::pagination::ListQuery;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/search", web::get().to(search))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::patch().to(update))
        .route("/{id}", web::delete().to(delete));
}

fn detail(store: &dyn Store, listing: Listing) -> StoreResult<ListingDetail> {
    let category = store.find_category(listing.category_id)?;
    let owner = store.find_customer(listing.listing_owner)?;
    Ok(ListingDetail {
        listing,
        category,
        owner,
    })
}

fn details(store: &dyn Store, listings: Vec<Listing>) -> StoreResult<Vec<ListingDetail>> {
    listings
        .into_iter()
        .map(|listing| detail(store, listing))
        .collect()
}

/// Checks that the referenced category, and subcategory when given, exist.
async fn check_references(
    state: &AppState,
    category_id: Option<Uuid>,
    subcategory_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(id) = category_id {
        if state.db(move |store| store.find_category(id)).await?.is_none() {
            return Err(ApiError::not_found("Category"));
        }
    }
    if let Some(id) = subcategory_id {
        if state.db(move |store| store.find_subcategory(id)).await?.is_none() {
            return Err(ApiError::not_found("Subcategory"));
        }
    }
    Ok(())
}

async fn name_taken(state: &AppState, name: &str) -> ApiResult<bool> {
    let lookup = name.to_string();
    Ok(state
        .db(move |store| store.find_listing_by_name(&lookup))
        .await?
        .is_some())
}

async fn create(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
    body: web::Json<CreateListingRequest>,
) -> ApiResult<HttpResponse> {
    let owner = auth.principal.require_customer()?;
    let body = validated(body)?;
    let listing_name = present(body.listing_name, "listing_name")?;
    let category_id = present(body.category_id, "category_id")?;

    if name_taken(&state, &listing_name).await? {
        return Err(ApiError::Conflict(
            "The listing title should be unique".into(),
        ));
    }
    check_references(&state, Some(category_id), body.subcategory_id).await?;

    let at = now();
    let new = NewListing {
        id: Uuid::new_v4(),
        listing_owner: owner,
        listing_name,
        city: body.city,
        province: body.province,
        category_id,
        subcategory_id: body.subcategory_id,
        short_description: body.short_description,
        long_description: body.long_description,
        price: body.price,
        active: present(body.active, "active")?,
        bed: body.bed,
        room: body.room,
        max_guests: body.max_guests,
        listing_image: present(body.listing_image, "listing_image")?,
        status: true,
        created_at: at,
        updated_at: at,
    };
    let listing = state.db(move |store| store.insert_listing(new)).await?;
    info!(listing_id = %listing.id, %owner, active = listing.active, "listing created");
    Ok(respond(
        StatusCode::CREATED,
        Some("Listing created successfully"),
        listing,
    ))
}

async fn list(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let listings = state
        .db(|store| {
            let listings = store.list_listings()?;
            details(store, listings)
        })
        .await?;
    Ok(ok(listings))
}

async fn search(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.page();
    let term = query.search_term().map(str::to_string);
    let listings = state
        .db(move |store| {
            let listings = store.search_listings(term.as_deref(), page)?;
            details(store, listings)
        })
        .await?;
    Ok(ok(listings))
}

async fn get_by_id(state: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let listing = state
        .db(move |store| match store.find_listing(id)? {
            Some(listing) => detail(store, listing).map(Some),
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    Ok(ok(listing))
}

async fn update(
    auth: Authorized<OwnerOrStaff>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateListingRequest>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let changes = validated(body)?.into_changes();

    let current = state
        .db(move |store| store.find_listing(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    if !auth.principal.may_manage(current.listing_owner) {
        warn!(listing_id = %id, principal = ?auth.principal, "listing update refused");
        return Err(ApiError::forbidden());
    }
    if changes.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }

    if let Some(name) = changes.listing_name.as_deref() {
        if name != current.listing_name && name_taken(&state, name).await? {
            return Err(ApiError::Conflict(
                "The listing title should be unique".into(),
            ));
        }
    }
    check_references(&state, changes.category_id, changes.subcategory_id).await?;

    let listing = state
        .db(move |store| store.update_listing(id, changes))
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    info!(listing_id = %id, active = listing.active, "listing updated");
    Ok(respond(
        StatusCode::OK,
        Some("Listing updated successfully"),
        listing,
    ))
}

async fn delete(
    auth: Authorized<OwnerOrStaff>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let current = state
        .db(move |store| store.find_listing(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    if !auth.principal.may_manage(current.listing_owner) {
        warn!(listing_id = %id, principal = ?auth.principal, "listing delete refused");
        return Err(ApiError::forbidden());
    }

    let listing = state
        .db(move |store| store.delete_listing(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Listing"))?;
    info!(listing_id = %id, "listing deleted");
    Ok(respond(
        StatusCode::OK,
        Some("Listing deleted successfully"),
        listing,
    ))
}
