mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::json;
use uuid::Uuid;

use common::{call, FakeGateway, TestContext, PASSWORD};
use rentlify::auth::{CUSTOMER_TOKEN_COOKIE, CUSTOMER_TOKEN_HEADER, STAFF_TOKEN_HEADER};
use rentlify::configure;
use rentlify::db::{ListingChanges, OrderStatus, Role, Store, Subcategory};

#[actix_web::test]
async fn test_register_login_and_create_listing() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let registration = json!({
        "email": "a@b.com",
        "password": PASSWORD,
        "first_name": "Amal",
        "last_name": "Bennani",
    });
    let req = test::TestRequest::post()
        .uri("/v1/customers")
        .set_json(&registration)
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "a@b.com");
    assert!(body["data"].get("password_hash").is_none());

    let sent = ctx.notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@b.com");

    let req = test::TestRequest::post()
        .uri("/v1/customers")
        .set_json(&registration)
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let req = test::TestRequest::post()
        .uri("/v1/customers/login")
        .set_json(json!({ "email": "a@b.com", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie_token = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == CUSTOMER_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .expect("login sets the session cookie");
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["expiresIn"], "3 days");
    let token = body["accessToken"].as_str().unwrap().to_string();
    assert_eq!(cookie_token, token);

    let claims = ctx.tokens.verify_customer(&token).unwrap();
    assert_eq!(claims.customer.email, "a@b.com");
    assert_eq!(claims.exp - claims.iat, 3 * 24 * 60 * 60);

    let category = ctx.category("Riads");
    let req = test::TestRequest::post()
        .uri("/v1/listings")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({
            "listing_name": "Riad Dar Zitoun",
            "listing_image": ["front.jpg"],
            "category_id": category.id,
            "active": true,
        }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("price"));
    assert!(ctx.store.list_listings().unwrap().is_empty());
}

#[actix_web::test]
async fn test_register_rejects_weak_password() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/v1/customers")
        .set_json(json!({
            "email": "weak@b.com",
            "password": "password",
            "first_name": "Weak",
            "last_name": "Password",
        }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("suggested pattern"));
    assert!(ctx.notifier.sent.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_login_rejects_inactive_customer_and_wrong_password() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (customer, _) = ctx.customer("sleepy@b.com");
    ctx.customer("awake@b.com");
    ctx.deactivate_customer(customer.id);

    let req = test::TestRequest::post()
        .uri("/v1/customers/login")
        .set_json(json!({ "email": "sleepy@b.com", "password": PASSWORD }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid Credentials");

    let req = test::TestRequest::post()
        .uri("/v1/customers/login")
        .set_json(json!({ "email": "awake@b.com", "password": "Wrong1!pass" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid Credentials");
}

#[actix_web::test]
async fn test_customer_gate() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (customer, token) = ctx.customer("gate@b.com");

    let req = test::TestRequest::get()
        .uri("/v1/customers/profile")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No Token Provided");

    let req = test::TestRequest::get()
        .uri("/v1/customers/profile")
        .insert_header((CUSTOMER_TOKEN_HEADER, "not-a-token"))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The header is preferred over a stale cookie.
    let req = test::TestRequest::get()
        .uri("/v1/customers/profile")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .cookie(actix_web::cookie::Cookie::new(CUSTOMER_TOKEN_COOKIE, "stale"))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], customer.id.to_string());

    ctx.store.delete_customer(customer.id).unwrap();
    let req = test::TestRequest::get()
        .uri("/v1/customers/profile")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No Customer found");
}

#[actix_web::test]
async fn test_staff_gate_and_roles() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, admin_token) = ctx.staff("admin", Role::Admin);
    let (manager, manager_token) = ctx.staff("manager", Role::Manager);
    let (_, customer_token) = ctx.customer("shopper@b.com");

    let req = test::TestRequest::get().uri("/v1/users").to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A customer token is not consulted on staff routes.
    let req = test::TestRequest::get()
        .uri("/v1/users")
        .insert_header((CUSTOMER_TOKEN_HEADER, customer_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, "garbage"))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid Token");

    let orphan = ctx.tokens.issue_staff(Uuid::new_v4()).unwrap();
    let req = test::TestRequest::get()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, orphan.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/users/{}", manager.id))
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(ctx.store.find_user(manager.id).unwrap().is_some());

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/users/{}", manager.id))
        .insert_header((STAFF_TOKEN_HEADER, admin_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.store.find_user(manager.id).unwrap().is_none());

    // The deleted manager's token no longer opens anything.
    let req = test::TestRequest::get()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_staff_login_and_user_creation() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    ctx.staff("boss", Role::Admin);

    let req = test::TestRequest::post()
        .uri("/v1/users/login")
        .set_json(json!({ "user_name": "boss", "password": PASSWORD }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expiresIn"], "7 days");
    let token = body["accessToken"].as_str().unwrap().to_string();
    let claims = ctx.tokens.verify_staff(&token).unwrap();
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);

    let req = test::TestRequest::post()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({
            "email": "desk@rentlify.com",
            "password": PASSWORD,
            "user_name": "desk",
            "first_name": "Front",
            "last_name": "Desk",
            "role": "owner",
        }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/v1/users")
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({
            "email": "desk@rentlify.com",
            "password": PASSWORD,
            "user_name": "desk",
            "first_name": "Front",
            "last_name": "Desk",
            "role": "manager",
        }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "manager");

    let req = test::TestRequest::put()
        .uri(&format!("/v1/users/{}", body["data"]["id"].as_str().unwrap()))
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_account_validation() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (customer, _) = ctx.customer("new@b.com");
    assert!(!customer.valid_account);

    let uri = format!("/v1/customers/validate/{}", customer.id);
    let req = test::TestRequest::put().uri(&uri).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid_account"], true);

    let req = test::TestRequest::put().uri(&uri).to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid action, this email is already validated"
    );

    let req = test::TestRequest::put()
        .uri(&format!("/v1/customers/validate/{}", Uuid::new_v4()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri("/v1/customers/validate/not-a-uuid")
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_profile_update_and_self_delete() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (customer, token) = ctx.customer("me@b.com");

    let req = test::TestRequest::patch()
        .uri("/v1/customers/profile/update")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri("/v1/customers/profile/update")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "first_name": "Yasmine" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Yasmine");

    let req = test::TestRequest::delete()
        .uri("/v1/customers/delete")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .response()
        .cookies()
        .find(|cookie| cookie.name() == CUSTOMER_TOKEN_COOKIE)
        .expect("delete clears the session cookie");
    assert!(cleared.value().is_empty());
    assert!(ctx.store.find_customer(customer.id).unwrap().is_none());
}

#[actix_web::test]
async fn test_inactive_listing_needs_no_price() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (owner, token) = ctx.customer("host@b.com");
    let category = ctx.category("Villas");

    let listing = json!({
        "listing_name": "Villa Oasis",
        "listing_image": ["pool.jpg"],
        "category_id": category.id,
        "active": false,
    });
    let req = test::TestRequest::post()
        .uri("/v1/listings")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(&listing)
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["listing_owner"], owner.id.to_string());
    assert!(body["data"]["price"].is_null());

    let req = test::TestRequest::post()
        .uri("/v1/listings")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(&listing)
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "The listing title should be unique");

    let req = test::TestRequest::post()
        .uri("/v1/listings")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({
            "listing_name": "Nowhere House",
            "listing_image": ["none.jpg"],
            "category_id": Uuid::new_v4(),
            "active": false,
        }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_listing_update_rules() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (owner, owner_token) = ctx.customer("owner@b.com");
    let (_, other_token) = ctx.customer("other@b.com");
    let (_, manager_token) = ctx.staff("manager", Role::Manager);
    let category = ctx.category("Apartments");
    let listing = ctx.listing(owner.id, category.id, "Atlas View");
    let uri = format!("/v1/listings/{}", listing.id);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, other_token.as_str()))
        .set_json(json!({ "city": "Fes" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, owner_token.as_str()))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, owner_token.as_str()))
        .set_json(json!({ "active": true }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .set_json(json!({ "city": "Essaouira", "price": 120.0 }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["city"], "Essaouira");
    assert_eq!(body["data"]["price"], 120.0);

    let req = test::TestRequest::patch()
        .uri(&format!("/v1/listings/{}", Uuid::new_v4()))
        .insert_header((CUSTOMER_TOKEN_HEADER, owner_token.as_str()))
        .set_json(json!({ "city": "Fes" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, owner_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = test::TestRequest::get().uri(&uri).to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_listing_detail_and_search() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (owner, _) = ctx.customer("lister@b.com");
    let category = ctx.category("Cabins");
    let listing = ctx.listing(owner.id, category.id, "Cedar Cabin");
    ctx.listing(owner.id, category.id, "Dune Camp");

    let req = test::TestRequest::get()
        .uri(&format!("/v1/listings/{}", listing.id))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["listing_name"], "Cedar Cabin");
    assert_eq!(body["data"]["category"]["category_name"], "Cabins");
    assert_eq!(body["data"]["owner"]["email"], "lister@b.com");

    let req = test::TestRequest::get()
        .uri("/v1/listings/search?query=cedar")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], listing.id.to_string());

    let req = test::TestRequest::get()
        .uri("/v1/listings/search?query=igloo")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_order_status_transitions() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (host, host_token) = ctx.customer("host@b.com");
    let (_, guest_token) = ctx.customer("guest@b.com");
    let (_, stranger_token) = ctx.customer("stranger@b.com");
    let category = ctx.category("Riads");
    let listing = ctx.listing(host.id, category.id, "Riad Yasmine");

    let req = test::TestRequest::post()
        .uri("/v1/orders")
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({
            "order_item": { "listing_id": listing.id, "nights": 3, "total": 270 },
        }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "Pending");
    let order_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/v1/orders/{order_id}");

    let status_of = |ctx: &TestContext| ctx.store.find_order(order_id).unwrap().unwrap().status;

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "status": "Pending" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Nothing to update. Enter the fields you want to update."
    );

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "status": "Shipped" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(status_of(&ctx), OrderStatus::Pending);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({}))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, stranger_token.as_str()))
        .set_json(json!({ "status": "Paid" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(status_of(&ctx), OrderStatus::Pending);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, host_token.as_str()))
        .set_json(json!({ "status": "Paid" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Paid");

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "status": "Canceled" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_of(&ctx), OrderStatus::Canceled);

    let req = test::TestRequest::put()
        .uri(&format!("/v1/orders/{}", Uuid::new_v4()))
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "status": "Paid" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_order_item_must_be_an_object() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, token) = ctx.customer("guest@b.com");

    let req = test::TestRequest::post()
        .uri("/v1/orders")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "order_item": ["not", "an", "object"] }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("The order items must be an object"));
    assert!(ctx.store.list_orders().unwrap().is_empty());
}

#[actix_web::test]
async fn test_host_sees_orders_on_own_listings() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (host, host_token) = ctx.customer("host@b.com");
    let (_, guest_token) = ctx.customer("guest@b.com");
    let category = ctx.category("Riads");
    let listing = ctx.listing(host.id, category.id, "Riad Anya");

    let req = test::TestRequest::post()
        .uri("/v1/orders")
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "order_item": { "listing_id": listing.id } }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/v1/orders/host")
        .insert_header((CUSTOMER_TOKEN_HEADER, host_token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["customer"]["email"], "guest@b.com");

    let req = test::TestRequest::get()
        .uri("/v1/orders/host")
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_order_booking_several_listings_reaches_each_host() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (host, host_token) = ctx.customer("host@b.com");
    let (other_host, _) = ctx.customer("other-host@b.com");
    let (_, guest_token) = ctx.customer("guest@b.com");
    let (_, stranger_token) = ctx.customer("stranger@b.com");
    let category = ctx.category("Riads");
    let mine = ctx.listing(host.id, category.id, "Riad Anya");
    let theirs = ctx.listing(other_host.id, category.id, "Riad Noor");

    let req = test::TestRequest::post()
        .uri("/v1/orders")
        .insert_header((CUSTOMER_TOKEN_HEADER, guest_token.as_str()))
        .set_json(json!({ "order_item": { "listing_id": [theirs.id, mine.id] } }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/v1/orders/host")
        .insert_header((CUSTOMER_TOKEN_HEADER, host_token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order_id.as_str());

    let req = test::TestRequest::put()
        .uri(&format!("/v1/orders/{order_id}"))
        .insert_header((CUSTOMER_TOKEN_HEADER, stranger_token.as_str()))
        .set_json(json!({ "status": "Paid" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&format!("/v1/orders/{order_id}"))
        .insert_header((CUSTOMER_TOKEN_HEADER, host_token.as_str()))
        .set_json(json!({ "status": "Paid" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Paid");
}

#[actix_web::test]
async fn test_subcategory_in_use_cannot_be_deleted() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, manager_token) = ctx.staff("manager", Role::Manager);
    let (owner, _) = ctx.customer("host@b.com");
    let category = ctx.category("Riads");

    let req = test::TestRequest::post()
        .uri("/v1/subcategories")
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .set_json(json!({
            "subcategory_name": "Rooftop",
            "category_id": category.id,
            "active": true,
        }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    let used: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let listing = ctx.listing(owner.id, category.id, "Riad Roof");
    ctx.store
        .update_listing(
            listing.id,
            ListingChanges {
                subcategory_id: Some(used),
                ..ListingChanges::default()
            },
        )
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/v1/subcategories/{used}"))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"]["category_name"], "Riads");

    let req = test::TestRequest::delete()
        .uri(&format!("/v1/subcategories/{used}"))
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "Subcategory has attached listings and cannot be deleted"
    );
    assert!(ctx.store.find_subcategory(used).unwrap().is_some());

    let unused = ctx
        .store
        .insert_subcategory(Subcategory {
            id: Uuid::new_v4(),
            subcategory_name: "Garden".into(),
            category_id: category.id,
            active: true,
        })
        .unwrap();
    let req = test::TestRequest::delete()
        .uri(&format!("/v1/subcategories/{}", unused.id))
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctx.store.find_subcategory(unused.id).unwrap().is_none());

    let req = test::TestRequest::post()
        .uri("/v1/subcategories")
        .insert_header((STAFF_TOKEN_HEADER, manager_token.as_str()))
        .set_json(json!({
            "subcategory_name": "Orphan",
            "category_id": Uuid::new_v4(),
            "active": true,
        }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_category_pages() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    for n in 1..=15 {
        ctx.category(&format!("cat-{n:02}"));
    }

    let req = test::TestRequest::get()
        .uri("/v1/categories?page=2&sort=ASC")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|category| category["category_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["cat-11", "cat-12", "cat-13", "cat-14", "cat-15"]);

    let req = test::TestRequest::get().uri("/v1/categories").to_request();
    let (_, body) = call(&app, req).await;
    let first = body["data"].as_array().unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[0]["category_name"], "cat-15");

    let req = test::TestRequest::get()
        .uri("/v1/categories?page=9")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_huge_page_number_is_an_empty_page() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    ctx.category("Riads");

    let req = test::TestRequest::get()
        .uri("/v1/categories?page=9223372036854775807")
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_category_update_rules() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, token) = ctx.staff("manager", Role::Manager);
    let villas = ctx.category("Villas");
    ctx.category("Riads");
    let uri = format!("/v1/categories/{}", villas.id);

    let req = test::TestRequest::post()
        .uri("/v1/categories")
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "category_name": "Riads", "category_icon": "mdi:door", "active": true }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "The category Riads already exists");

    for unchanged in [json!({}), json!({ "category_name": "Villas", "active": true })] {
        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
            .set_json(unchanged)
            .to_request();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "category_name": "Riads" }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "category_name": "Beach Villas" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category_name"], "Beach Villas");

    let req = test::TestRequest::put()
        .uri(&format!("/v1/categories/{}", Uuid::new_v4()))
        .insert_header((STAFF_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "category_name": "Ghost" }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category Not Found (Invalid ID)");
}

#[actix_web::test]
async fn test_payment_intent() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, token) = ctx.customer("payer@b.com");

    let req = test::TestRequest::post()
        .uri("/v1/create-payment-intent")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "items": { "total_with_fees": 120.559 } }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "pi_12055_secret");
    let sent = ctx.payments.requests.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount, 12055);

    let req = test::TestRequest::post()
        .uri("/v1/create-payment-intent")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "items": { "total_with_fees": 0 } }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.payments.requests.lock().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/v1/create-payment-intent")
        .set_json(json!({ "items": { "total_with_fees": 10 } }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_payment_provider_failure() {
    let ctx = TestContext::with_gateway(FakeGateway {
        fail: true,
        ..FakeGateway::default()
    });
    let app = test::init_service(App::new().app_data(ctx.state.clone()).configure(configure)).await;
    let (_, token) = ctx.customer("payer@b.com");

    let req = test::TestRequest::post()
        .uri("/v1/create-payment-intent")
        .insert_header((CUSTOMER_TOKEN_HEADER, token.as_str()))
        .set_json(json!({ "items": { "total_with_fees": 50 } }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Payment provider unavailable");
}
