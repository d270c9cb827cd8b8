#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use uuid::Uuid;

use rentlify::auth::{hash_password, TokenService};
use rentlify::config::Settings;
use rentlify::db::{
    now, Category, Customer, CustomerChanges, Listing, MemoryStore, NewCategory, NewCustomer,
    NewListing, NewUser, Role, Store, User,
};
use rentlify::notify::Notifier;
use rentlify::payment::{IntentRequest, PaymentError, PaymentGateway};
use rentlify::AppState;

pub const PASSWORD: &str = "Secret1!x";

/// bcrypt at cost 10 is slow in debug builds; hash the shared password once.
pub fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap())
}

pub fn settings() -> Settings {
    Settings {
        database_url: "postgres://localhost/rentlify_test".into(),
        database_pool_size: 1,
        database_timeout_seconds: 1,
        jwt_token: "customer-test-secret".into(),
        jwt_user_token: "staff-test-secret".into(),
        host: "127.0.0.1".into(),
        port: 0,
        allowed_origins: "http://localhost:5173".into(),
        stripe_secret_key: None,
        stripe_api_base: "http://127.0.0.1:9".into(),
        public_url: "http://localhost:5000".into(),
        email_validation: true,
        smtp_host: None,
        smtp_username: None,
        smtp_password: None,
        mail_from: None,
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<IntentRequest>>,
    pub fail: bool,
}

impl PaymentGateway for FakeGateway {
    fn create_intent(&self, request: IntentRequest) -> LocalBoxFuture<'_, Result<String, PaymentError>> {
        self.requests.lock().unwrap().push(request);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(PaymentError::Rejected {
                    status: 402,
                    body: "card_declined".into(),
                })
            } else {
                Ok(format!("pi_{}_secret", request.amount))
            }
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Uuid)>>,
}

impl Notifier for RecordingNotifier {
    fn send_validation(&self, email: &str, customer_id: Uuid) {
        self.sent.lock().unwrap().push((email.to_string(), customer_id));
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: Arc<TokenService>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_gateway(FakeGateway::default())
    }

    pub fn with_gateway(gateway: FakeGateway) -> Self {
        rentlify::telemetry::init_for_tests();
        let settings = settings();
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(gateway);
        let notifier = Arc::new(RecordingNotifier::default());
        let tokens = Arc::new(TokenService::from_settings(&settings));
        let state = web::Data::new(AppState {
            store: store.clone(),
            tokens: tokens.clone(),
            payments: payments.clone(),
            notifier: notifier.clone(),
            settings: Arc::new(settings),
        });
        Self {
            store,
            payments,
            notifier,
            tokens,
            state,
        }
    }

    /// Stores an active customer with [`PASSWORD`] and returns a token for it.
    pub fn customer(&self, email: &str) -> (Customer, String) {
        let customer = self
            .store
            .insert_customer(NewCustomer::register(
                "Test".into(),
                email.split('@').next().unwrap_or("user").into(),
                email.into(),
                password_hash().into(),
            ))
            .unwrap();
        let token = self.tokens.issue_customer(&customer).unwrap();
        (customer, token)
    }

    pub fn deactivate_customer(&self, id: Uuid) {
        self.store
            .update_customer(
                id,
                CustomerChanges {
                    active: Some(false),
                    ..CustomerChanges::default()
                },
            )
            .unwrap();
    }

    pub fn staff(&self, user_name: &str, role: Role) -> (User, String) {
        let at = now();
        let user = self
            .store
            .insert_user(NewUser {
                id: Uuid::new_v4(),
                first_name: "Staff".into(),
                last_name: user_name.into(),
                email: format!("{user_name}@rentlify.com"),
                user_name: user_name.into(),
                password_hash: password_hash().into(),
                role,
                active: true,
                created_at: at,
                updated_at: at,
            })
            .unwrap();
        let token = self.tokens.issue_staff(user.id).unwrap();
        (user, token)
    }

    pub fn category(&self, name: &str) -> Category {
        let at = now();
        self.store
            .insert_category(NewCategory {
                id: Uuid::new_v4(),
                category_name: name.into(),
                category_icon: "mdi:home".into(),
                active: true,
                created_at: at,
                updated_at: at,
            })
            .unwrap()
    }

    pub fn listing(&self, owner: Uuid, category: Uuid, name: &str) -> Listing {
        let at = now();
        self.store
            .insert_listing(NewListing {
                id: Uuid::new_v4(),
                listing_owner: owner,
                listing_name: name.into(),
                city: Some("Marrakesh".into()),
                province: Some("Marrakesh-Safi".into()),
                category_id: category,
                subcategory_id: None,
                short_description: None,
                long_description: None,
                price: Some(90.0),
                active: true,
                bed: Some(2),
                room: Some(1),
                max_guests: Some(4),
                listing_image: vec!["riad.jpg".into()],
                status: true,
                created_at: at,
                updated_at: at,
            })
            .unwrap()
    }
}

/// Sends `req` and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty body).
pub async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}
