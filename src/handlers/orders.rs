use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AnyCustomer, Authorized, StaffManager};
use crate::db::{NewOrder, Order, Store, StoreResult};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ok, present, respond, validated};
use crate::models::{CreateOrderRequest, OrderDetail, UpdateOrderStatusRequest};
use crate::validation::parse_order_status;
use crate::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create))
        .route("", web::get().to(list))
        .route("/host", web::get().to(host_orders))
        .route("/{id}", web::get().to(get_by_id))
        .route("/{id}", web::put().to(update_status));
}

fn details(store: &dyn Store, orders: Vec<Order>) -> StoreResult<Vec<OrderDetail>> {
    orders
        .into_iter()
        .map(|order| {
            let customer = store.find_customer(order.customer_id)?;
            Ok(OrderDetail { order, customer })
        })
        .collect()
}

async fn create(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> ApiResult<HttpResponse> {
    let customer_id = auth.principal.require_customer()?;
    let order_item = present(validated(body)?.order_item, "order_item")?;
    let order = state
        .db(move |store| store.insert_order(NewOrder::pending(customer_id, order_item)))
        .await?;
    info!(order_id = %order.id, %customer_id, "order created");
    Ok(respond(
        StatusCode::CREATED,
        Some("Order Created Successfully"),
        order,
    ))
}

async fn list(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let orders = state
        .db(|store| {
            let orders = store.list_orders()?;
            details(store, orders)
        })
        .await?;
    Ok(ok(orders))
}

/// Orders placed against any listing the caller owns.
async fn host_orders(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let host = auth.principal.require_customer()?;
    let orders = state
        .db(move |store| {
            let listing_ids: Vec<Uuid> = store
                .listings_owned_by(host)?
                .into_iter()
                .map(|listing| listing.id)
                .collect();
            let orders = store.orders_for_listings(&listing_ids)?;
            details(store, orders)
        })
        .await?;
    Ok(ok(orders))
}

async fn get_by_id(
    _auth: Authorized<StaffManager>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let order = state
        .db(move |store| match store.find_order(id)? {
            Some(order) => {
                let customer = store.find_customer(order.customer_id)?;
                Ok(Some(OrderDetail { order, customer }))
            }
            None => Ok(None),
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    Ok(ok(order))
}

/// Moves an order to another status. The caller must have placed the order
/// or own one of the listings it books.
async fn update_status(
    auth: Authorized<AnyCustomer>,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> ApiResult<HttpResponse> {
    let caller = auth.principal.require_customer()?;
    let id = path.into_inner();
    let Some(requested) = body.into_inner().status.filter(|status| !status.is_empty()) else {
        return Err(ApiError::NoOpUpdate);
    };
    let status = parse_order_status(&requested)
        .map_err(|err| ApiError::Validation(err.to_string()))?;

    let order = state
        .db(move |store| store.find_order(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    if order.status == status {
        return Err(ApiError::NoOpUpdate);
    }

    let booked = order.listing_ids();
    let hosts_listing = order.customer_id != caller
        && !booked.is_empty()
        && state
            .db(move |store| {
                let owned: Vec<Uuid> = store
                    .listings_owned_by(caller)?
                    .into_iter()
                    .map(|listing| listing.id)
                    .collect();
                Ok(booked.iter().any(|id| owned.contains(id)))
            })
            .await?;
    if order.customer_id != caller && !hosts_listing {
        warn!(order_id = %id, %caller, "order status change refused");
        return Err(ApiError::forbidden());
    }

    let order = state
        .db(move |store| store.update_order_status(id, status))
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;
    info!(order_id = %id, status = %order.status, %caller, "order status updated");
    Ok(respond(
        StatusCode::OK,
        Some("Order status updated successfully"),
        order,
    ))
}
