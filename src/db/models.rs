use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::schema::{categories, customers, listings, orders, subcategories, users};

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        Ok(std::str::from_utf8(bytes.as_bytes())?.parse::<Role>()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum OrderStatus {
    Pending,
    Paid,
    Closed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Closed => "Closed",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(OrderStatus::Pending),
            "Paid" => Ok(OrderStatus::Paid),
            "Closed" => Ok(OrderStatus::Closed),
            "Canceled" => Ok(OrderStatus::Canceled),
            other => Err(UnknownVariant {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

impl ToSql<Text, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        Ok(std::str::from_utf8(bytes.as_bytes())?.parse::<OrderStatus>()?)
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_name: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<NewUser> for User {
    fn from(new: NewUser) -> Self {
        User {
            id: new.id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            user_name: new.user_name,
            password_hash: new.password_hash,
            role: new.role,
            active: new.active,
            last_login: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.active.is_none()
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub valid_account: bool,
    pub active: bool,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub valid_account: bool,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewCustomer {
    /// A freshly registered account: active, not yet email-validated.
    pub fn register(first_name: String, last_name: String, email: String, password_hash: String) -> Self {
        let at = now();
        NewCustomer {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            password_hash,
            valid_account: false,
            active: true,
            created_at: at,
            updated_at: at,
        }
    }
}

impl From<NewCustomer> for Customer {
    fn from(new: NewCustomer) -> Self {
        Customer {
            id: new.id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password_hash: new.password_hash,
            valid_account: new.valid_account,
            active: new.active,
            last_login: None,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = customers)]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub valid_account: Option<bool>,
    pub active: Option<bool>,
}

impl CustomerChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.valid_account.is_none()
            && self.active.is_none()
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: Uuid,
    pub category_name: String,
    pub category_icon: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub id: Uuid,
    pub category_name: String,
    pub category_icon: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<NewCategory> for Category {
    fn from(new: NewCategory) -> Self {
        Category {
            id: new.id,
            category_name: new.category_name,
            category_icon: new.category_icon,
            active: new.active,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = categories)]
pub struct CategoryChanges {
    pub category_name: Option<String>,
    pub category_icon: Option<String>,
    pub active: Option<bool>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.category_name.is_none() && self.category_icon.is_none() && self.active.is_none()
    }

    /// True when every provided field already holds the stored value.
    pub fn matches(&self, category: &Category) -> bool {
        self.category_name.as_ref().map_or(true, |name| *name == category.category_name)
            && self.category_icon.as_ref().map_or(true, |icon| *icon == category.category_icon)
            && self.active.map_or(true, |active| active == category.active)
    }
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = subcategories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subcategory {
    pub id: Uuid,
    pub subcategory_name: String,
    pub category_id: Uuid,
    pub active: bool,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Listing {
    pub id: Uuid,
    pub listing_owner: Uuid,
    pub listing_name: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub price: Option<f64>,
    pub active: bool,
    pub bed: Option<i32>,
    pub room: Option<i32>,
    pub max_guests: Option<i32>,
    pub listing_image: Vec<String>,
    pub status: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = listings)]
pub struct NewListing {
    pub id: Uuid,
    pub listing_owner: Uuid,
    pub listing_name: String,
    pub city: Option<String>,
    pub province: Option<String>,
    pub category_id: Uuid,
    pub subcategory_id: Option<Uuid>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub price: Option<f64>,
    pub active: bool,
    pub bed: Option<i32>,
    pub room: Option<i32>,
    pub max_guests: Option<i32>,
    pub listing_image: Vec<String>,
    pub status: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<NewListing> for Listing {
    fn from(new: NewListing) -> Self {
        Listing {
            id: new.id,
            listing_owner: new.listing_owner,
            listing_name: new.listing_name,
            city: new.city,
            province: new.province,
            category_id: new.category_id,
            subcategory_id: new.subcategory_id,
            short_description: new.short_description,
            long_description: new.long_description,
            price: new.price,
            active: new.active,
            bed: new.bed,
            room: new.room,
            max_guests: new.max_guests,
            listing_image: new.listing_image,
            status: new.status,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = listings)]
pub struct ListingChanges {
    pub listing_name: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub price: Option<f64>,
    pub active: Option<bool>,
    pub bed: Option<i32>,
    pub room: Option<i32>,
    pub max_guests: Option<i32>,
    pub listing_image: Option<Vec<String>>,
    pub status: Option<bool>,
}

impl ListingChanges {
    pub fn is_empty(&self) -> bool {
        self.listing_name.is_none()
            && self.city.is_none()
            && self.province.is_none()
            && self.category_id.is_none()
            && self.subcategory_id.is_none()
            && self.short_description.is_none()
            && self.long_description.is_none()
            && self.price.is_none()
            && self.active.is_none()
            && self.bed.is_none()
            && self.room.is_none()
            && self.max_guests.is_none()
            && self.listing_image.is_none()
            && self.status.is_none()
    }

    pub fn apply(self, listing: &mut Listing) {
        if let Some(value) = self.listing_name {
            listing.listing_name = value;
        }
        if let Some(value) = self.city {
            listing.city = Some(value);
        }
        if let Some(value) = self.province {
            listing.province = Some(value);
        }
        if let Some(value) = self.category_id {
            listing.category_id = value;
        }
        if let Some(value) = self.subcategory_id {
            listing.subcategory_id = Some(value);
        }
        if let Some(value) = self.short_description {
            listing.short_description = Some(value);
        }
        if let Some(value) = self.long_description {
            listing.long_description = Some(value);
        }
        if let Some(value) = self.price {
            listing.price = Some(value);
        }
        if let Some(value) = self.active {
            listing.active = value;
        }
        if let Some(value) = self.bed {
            listing.bed = Some(value);
        }
        if let Some(value) = self.room {
            listing.room = Some(value);
        }
        if let Some(value) = self.max_guests {
            listing.max_guests = Some(value);
        }
        if let Some(value) = self.listing_image {
            listing.listing_image = value;
        }
        if let Some(value) = self.status {
            listing.status = value;
        }
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_item: serde_json::Value,
    pub status: OrderStatus,
    pub order_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Order {
    /// Every listing this booking covers. `order_item.listing_id` holds
    /// either one id or an array of ids; anything unparsable is skipped.
    pub fn listing_ids(&self) -> Vec<Uuid> {
        let parse = |value: &serde_json::Value| value.as_str().and_then(|id| Uuid::parse_str(id).ok());
        match self.order_item.get("listing_id") {
            Some(serde_json::Value::Array(ids)) => ids.iter().filter_map(parse).collect(),
            Some(id) => parse(id).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn books_any(&self, listing_ids: &[Uuid]) -> bool {
        self.listing_ids().iter().any(|id| listing_ids.contains(id))
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_item: serde_json::Value,
    pub status: OrderStatus,
    pub order_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewOrder {
    /// Every booking starts out pending.
    pub fn pending(customer_id: Uuid, order_item: serde_json::Value) -> Self {
        let at = now();
        NewOrder {
            id: Uuid::new_v4(),
            customer_id,
            order_item,
            status: OrderStatus::Pending,
            order_date: at,
            created_at: at,
            updated_at: at,
        }
    }
}

impl From<NewOrder> for Order {
    fn from(new: NewOrder) -> Self {
        Order {
            id: new.id,
            customer_id: new.customer_id,
            order_item: new.order_item,
            status: new.status,
            order_date: new.order_date,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}
