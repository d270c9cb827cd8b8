use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Settings;
use crate::db::Customer;

pub const CUSTOMER_TOKEN_TTL_SECS: i64 = 3 * 24 * 60 * 60;
pub const STAFF_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Claims of a customer session. The customer record is embedded as it was
/// at login, minus the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerClaims {
    pub customer: Customer,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier for both principal kinds. Customer and staff
/// tokens use disjoint secrets, so one kind never verifies as the other.
pub struct TokenService {
    customer_encoding: EncodingKey,
    customer_decoding: DecodingKey,
    staff_encoding: EncodingKey,
    staff_decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(customer_secret: &str, staff_secret: &str) -> Self {
        Self {
            customer_encoding: EncodingKey::from_secret(customer_secret.as_bytes()),
            customer_decoding: DecodingKey::from_secret(customer_secret.as_bytes()),
            staff_encoding: EncodingKey::from_secret(staff_secret.as_bytes()),
            staff_decoding: DecodingKey::from_secret(staff_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.jwt_token, &settings.jwt_user_token)
    }

    pub fn issue_customer(&self, customer: &Customer) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = CustomerClaims {
            customer: customer.clone(),
            iat,
            exp: iat + CUSTOMER_TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.customer_encoding).map_err(TokenError::Sign)
    }

    pub fn verify_customer(&self, token: &str) -> Result<CustomerClaims, TokenError> {
        decode::<CustomerClaims>(token, &self.customer_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }

    pub fn issue_staff(&self, user_id: Uuid) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = StaffClaims {
            user_id,
            iat,
            exp: iat + STAFF_TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.staff_encoding).map_err(TokenError::Sign)
    }

    pub fn verify_staff(&self, token: &str) -> Result<StaffClaims, TokenError> {
        decode::<StaffClaims>(token, &self.staff_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}
