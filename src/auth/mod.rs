pub mod password;
pub mod principal;
pub mod token;

pub use password::{hash_password, verify_password};
pub use principal::{
    expired_cookie, token_cookie, AnyCustomer, Authorized, Capability, OwnerOrStaff, Principal,
    StaffAdmin, StaffManager, CUSTOMER_TOKEN_COOKIE, CUSTOMER_TOKEN_HEADER, STAFF_TOKEN_COOKIE,
    STAFF_TOKEN_HEADER,
};
pub use token::{
    CustomerClaims, StaffClaims, TokenError, TokenService, CUSTOMER_TOKEN_TTL_SECS,
    STAFF_TOKEN_TTL_SECS,
};
