use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{
    Category, CategoryChanges, Customer, CustomerChanges, Listing, ListingChanges, Order, Role,
    Subcategory, User, UserChanges,
};
use crate::validation::{
    validate_listing_update, validate_new_listing, validate_new_user, validate_order_item,
    validate_payment_total, validate_registration, validate_user_update,
};

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: u16, message: Option<&str>, data: T) -> Self {
        Self {
            status,
            success: true,
            message: message.map(str::to_string),
            data,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_registration", skip_on_field_errors = false))]
pub struct RegisterCustomerRequest {
    #[validate(
        required(message = "Your email is required"),
        email(message = "Your email must be a valid email")
    )]
    pub email: Option<String>,
    #[validate(required(message = "The password is required"))]
    pub password: Option<String>,
    #[validate(
        required(message = "The first name is required"),
        length(min = 1, max = 20, message = "first_name must be 1 to 20 characters")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "The last name is required"),
        length(min = 1, max = 20, message = "last_name must be 1 to 20 characters")
    )]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerLoginRequest {
    #[validate(required(message = "Your email is required"))]
    pub email: Option<String>,
    #[validate(required(message = "The password is required"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 20, message = "first_name must be 1 to 20 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "last_name must be 1 to 20 characters"))]
    pub last_name: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> CustomerChanges {
        CustomerChanges {
            first_name: self.first_name,
            last_name: self.last_name,
            ..CustomerChanges::default()
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(email(message = "Your email must be a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20, message = "first_name must be 1 to 20 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 20, message = "last_name must be 1 to 20 characters"))]
    pub last_name: Option<String>,
    pub active: Option<bool>,
}

impl UpdateCustomerRequest {
    pub fn into_changes(self) -> CustomerChanges {
        CustomerChanges {
            email: self.email.map(|email| email.trim().to_string()),
            first_name: self.first_name,
            last_name: self.last_name,
            active: self.active,
            ..CustomerChanges::default()
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StaffLoginRequest {
    #[validate(required(message = "The username is required"))]
    pub user_name: Option<String>,
    #[validate(required(message = "The password is required"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_new_user", skip_on_field_errors = false))]
pub struct CreateUserRequest {
    #[validate(
        required(message = "The email address is required"),
        email(message = "The email address must be valid")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "The password is required"),
        length(min = 8, max = 30, message = "The password must be 8 to 30 characters")
    )]
    pub password: Option<String>,
    #[validate(
        required(message = "The username is required"),
        length(min = 3, max = 30, message = "The username must be 3 to 30 characters")
    )]
    pub user_name: Option<String>,
    #[validate(
        required(message = "The first name is required"),
        length(min = 1, message = "The first name is required")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "The last name is required"),
        length(min = 1, message = "The last name is required")
    )]
    pub last_name: Option<String>,
    #[validate(required(message = "The role is required"))]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_user_update", skip_on_field_errors = false))]
pub struct UpdateUserRequest {
    #[validate(email(message = "The email address must be valid"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "first_name can not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name can not be empty"))]
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
}

impl UpdateUserRequest {
    /// Call after `validate`, which rejects unknown roles.
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            email: self.email.map(|email| email.trim().to_string()),
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role.and_then(|role| role.parse::<Role>().ok()),
            active: self.active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        required(message = "Category name is required"),
        length(min = 1, message = "Category name is required")
    )]
    pub category_name: Option<String>,
    #[validate(
        required(message = "Category icon is required"),
        length(min = 1, message = "Category icon is required")
    )]
    pub category_icon: Option<String>,
    #[validate(required(message = "Category status (active) is required"))]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "Category name can not be empty"))]
    pub category_name: Option<String>,
    #[validate(length(min = 1, message = "Category icon can not be empty"))]
    pub category_icon: Option<String>,
    pub active: Option<bool>,
}

impl UpdateCategoryRequest {
    pub fn into_changes(self) -> CategoryChanges {
        CategoryChanges {
            category_name: self.category_name,
            category_icon: self.category_icon,
            active: self.active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubcategoryRequest {
    #[validate(
        required(message = "Subcategory name is required"),
        length(min = 1, message = "Subcategory name is required")
    )]
    pub subcategory_name: Option<String>,
    #[validate(required(message = "The category id is required"))]
    pub category_id: Option<Uuid>,
    #[validate(required(message = "Subcategory status (active) is required"))]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_new_listing", skip_on_field_errors = false))]
pub struct CreateListingRequest {
    #[validate(
        required(message = "The listing name is required"),
        length(min = 1, message = "The listing name is required")
    )]
    pub listing_name: Option<String>,
    #[validate(required(message = "The Image of the listing is required"))]
    pub listing_image: Option<Vec<String>>,
    #[validate(required(message = "The category id is required"))]
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    #[validate(required(message = "The listing status (active) is required"))]
    pub active: Option<bool>,
    #[validate(range(min = 0.0, message = "price can not be negative"))]
    pub price: Option<f64>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    #[validate(range(min = 0, message = "bed can not be negative"))]
    pub bed: Option<i32>,
    #[validate(range(min = 0, message = "room can not be negative"))]
    pub room: Option<i32>,
    #[validate(range(min = 0, message = "max_guests can not be negative"))]
    pub max_guests: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_listing_update", skip_on_field_errors = false))]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, message = "The listing name can not be empty"))]
    pub listing_name: Option<String>,
    pub listing_image: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub active: Option<bool>,
    #[validate(range(min = 0.0, message = "price can not be negative"))]
    pub price: Option<f64>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    #[validate(range(min = 0, message = "bed can not be negative"))]
    pub bed: Option<i32>,
    #[validate(range(min = 0, message = "room can not be negative"))]
    pub room: Option<i32>,
    #[validate(range(min = 0, message = "max_guests can not be negative"))]
    pub max_guests: Option<i32>,
    pub status: Option<bool>,
}

impl UpdateListingRequest {
    pub fn into_changes(self) -> ListingChanges {
        ListingChanges {
            listing_name: self.listing_name,
            city: self.city,
            province: self.province,
            category_id: self.category_id,
            subcategory_id: self.subcategory_id,
            short_description: self.short_description,
            long_description: self.long_description,
            price: self.price,
            active: self.active,
            bed: self.bed,
            room: self.room,
            max_guests: self.max_guests,
            listing_image: self.listing_image,
            status: self.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_order_item"))]
pub struct CreateOrderRequest {
    pub order_item: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_payment_total"))]
pub struct PaymentIntentRequest {
    pub items: Option<PaymentItems>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentItems {
    pub total_with_fees: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLoginResponse {
    pub message: &'static str,
    pub access_token: String,
    pub expires_in: &'static str,
    pub customer: Customer,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffLoginResponse {
    pub message: &'static str,
    pub access_token: String,
    pub expires_in: &'static str,
    pub user: User,
}

/// A listing with its category and owner profile resolved.
#[derive(Debug, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub category: Option<Category>,
    pub owner: Option<Customer>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<Customer>,
}

#[derive(Debug, Serialize)]
pub struct SubcategoryDetail {
    #[serde(flatten)]
    pub subcategory: Subcategory,
    pub category: Option<Category>,
}
