use std::marker::PhantomData;

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::Role;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const CUSTOMER_TOKEN_HEADER: &str = "x-client-token";
pub const CUSTOMER_TOKEN_COOKIE: &str = "clientToken";
pub const STAFF_TOKEN_HEADER: &str = "x-user-token";
pub const STAFF_TOKEN_COOKIE: &str = "userToken";

/// Who is making the request, resolved once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Customer(Uuid),
    Staff { id: Uuid, role: Role },
}

impl Principal {
    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            Principal::Customer(id) => Some(*id),
            _ => None,
        }
    }

    pub fn require_customer(&self) -> ApiResult<Uuid> {
        self.customer_id().ok_or_else(ApiError::forbidden)
    }

    pub fn is_staff_manager(&self) -> bool {
        matches!(
            self,
            Principal::Staff {
                role: Role::Admin | Role::Manager,
                ..
            }
        )
    }

    /// Owners manage their own resources; admins and managers manage all.
    pub fn may_manage(&self, owner_id: Uuid) -> bool {
        match self {
            Principal::Customer(id) => *id == owner_id,
            Principal::Staff { .. } => self.is_staff_manager(),
            Principal::Anonymous => false,
        }
    }
}

/// A predicate a route requires of its caller. The gate constants select
/// which token kinds are consulted; when both are, the customer token is
/// tried first.
pub trait Capability {
    const CUSTOMER_GATE: bool;
    const STAFF_GATE: bool;

    fn permits(principal: &Principal) -> bool;
}

pub struct AnyCustomer;

impl Capability for AnyCustomer {
    const CUSTOMER_GATE: bool = true;
    const STAFF_GATE: bool = false;

    fn permits(principal: &Principal) -> bool {
        matches!(principal, Principal::Customer(_))
    }
}

pub struct StaffManager;

impl Capability for StaffManager {
    const CUSTOMER_GATE: bool = false;
    const STAFF_GATE: bool = true;

    fn permits(principal: &Principal) -> bool {
        principal.is_staff_manager()
    }
}

pub struct StaffAdmin;

impl Capability for StaffAdmin {
    const CUSTOMER_GATE: bool = false;
    const STAFF_GATE: bool = true;

    fn permits(principal: &Principal) -> bool {
        matches!(
            principal,
            Principal::Staff {
                role: Role::Admin,
                ..
            }
        )
    }
}

/// Any customer (ownership is then checked against the resource with
/// [`Principal::may_manage`]) or an admin/manager.
pub struct OwnerOrStaff;

impl Capability for OwnerOrStaff {
    const CUSTOMER_GATE: bool = true;
    const STAFF_GATE: bool = true;

    fn permits(principal: &Principal) -> bool {
        matches!(principal, Principal::Customer(_)) || principal.is_staff_manager()
    }
}

/// Extractor that authenticates the caller and evaluates capability `C`
/// before the handler body runs.
pub struct Authorized<C: Capability> {
    pub principal: Principal,
    _capability: PhantomData<C>,
}

impl<C: Capability> Authorized<C> {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            _capability: PhantomData,
        }
    }
}

impl<C: Capability + 'static> FromRequest for Authorized<C> {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let customer_token = C::CUSTOMER_GATE
            .then(|| request_token(req, CUSTOMER_TOKEN_HEADER, CUSTOMER_TOKEN_COOKIE))
            .flatten();
        let staff_token = C::STAFF_GATE
            .then(|| request_token(req, STAFF_TOKEN_HEADER, STAFF_TOKEN_COOKIE))
            .flatten();
        let path = req.path().to_string();

        Box::pin(async move {
            let state =
                state.ok_or_else(|| ApiError::Internal("application state missing".into()))?;
            let principal = match (customer_token, staff_token) {
                (Some(token), _) => customer_gate(&state, &token).await?,
                (None, Some(token)) => staff_gate(&state, &token).await?,
                (None, None) => {
                    debug!(%path, "no token provided");
                    return Err(ApiError::Unauthenticated);
                }
            };
            if !C::permits(&principal) {
                warn!(%path, ?principal, "insufficient privilege");
                return Err(ApiError::forbidden());
            }
            Ok(Authorized::new(principal))
        })
    }
}

/// Header wins over cookie.
fn request_token(req: &HttpRequest, header: &str, cookie: &str) -> Option<String> {
    req.headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| {
            req.cookie(cookie)
                .map(|cookie| cookie.value().to_string())
                .filter(|token| !token.is_empty())
        })
}

async fn customer_gate(state: &AppState, token: &str) -> ApiResult<Principal> {
    let claims = state.tokens.verify_customer(token).map_err(|err| {
        warn!(error = %err, "customer token rejected");
        ApiError::Unauthorized
    })?;
    let id = claims.customer.id;
    match state.db(move |store| store.find_customer(id)).await? {
        Some(customer) => Ok(Principal::Customer(customer.id)),
        None => {
            warn!(customer_id = %id, "token for a customer that no longer exists");
            Err(ApiError::NotFound("No Customer found".into()))
        }
    }
}

async fn staff_gate(state: &AppState, token: &str) -> ApiResult<Principal> {
    let claims = state.tokens.verify_staff(token).map_err(|err| {
        warn!(error = %err, "staff token rejected");
        ApiError::InvalidToken
    })?;
    let id = claims.user_id;
    match state.db(move |store| store.find_user(id)).await? {
        Some(user) if user.active => Ok(Principal::Staff {
            id: user.id,
            role: user.role,
        }),
        _ => {
            warn!(user_id = %id, "token for a missing or inactive staff user");
            Err(ApiError::forbidden())
        }
    }
}

/// The session cookie set on login. Readable from scripts and sent
/// cross-site, so it must travel over HTTPS.
pub fn token_cookie(name: &'static str, token: String, ttl_secs: i64) -> Cookie<'static> {
    Cookie::build(name, token)
        .path("/")
        .secure(true)
        .http_only(false)
        .same_site(SameSite::None)
        .max_age(Duration::seconds(ttl_secs))
        .finish()
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "")
        .path("/")
        .secure(true)
        .same_site(SameSite::None)
        .finish();
    cookie.make_removal();
    cookie
}
