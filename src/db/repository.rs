use chrono::NaiveDateTime;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Array, Bool, Text};
use thiserror::Error;
use uuid::Uuid;

use crate::db::connection::{PgPool, PgPooledConnection};
use crate::db::models::*;
use crate::db::schema::*;
use crate::pagination::{Page, SortOrder};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A unique or restricting foreign-key constraint rejected the write;
    /// carries the constraint name.
    #[error("constraint `{0}` violated")]
    Conflict(String),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Database(DieselError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.constraint_name().unwrap_or("unique").to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::Conflict(info.constraint_name().unwrap_or("foreign_key").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations the handlers depend on. Implementations are
/// synchronous; callers run them on the blocking pool.
pub trait Store: Send + Sync {
    fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    fn find_active_user_by_user_name(&self, user_name: &str) -> StoreResult<Option<User>>;
    fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<User>>;
    fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>>;
    fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    fn record_user_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()>;

    fn insert_customer(&self, customer: NewCustomer) -> StoreResult<Customer>;
    fn find_customer(&self, id: Uuid) -> StoreResult<Option<Customer>>;
    fn find_active_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>>;
    fn list_customers(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Customer>>;
    fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> StoreResult<Option<Customer>>;
    fn delete_customer(&self, id: Uuid) -> StoreResult<bool>;
    fn record_customer_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()>;

    fn insert_category(&self, category: NewCategory) -> StoreResult<Category>;
    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;
    fn list_categories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Category>>;
    fn update_category(&self, id: Uuid, changes: CategoryChanges) -> StoreResult<Option<Category>>;
    fn delete_category(&self, id: Uuid) -> StoreResult<Option<Category>>;

    fn insert_subcategory(&self, subcategory: Subcategory) -> StoreResult<Subcategory>;
    fn find_subcategory(&self, id: Uuid) -> StoreResult<Option<Subcategory>>;
    fn list_subcategories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Subcategory>>;
    fn subcategory_in_use(&self, id: Uuid) -> StoreResult<bool>;
    fn delete_subcategory(&self, id: Uuid) -> StoreResult<bool>;

    fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing>;
    fn find_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;
    fn find_listing_by_name(&self, name: &str) -> StoreResult<Option<Listing>>;
    fn list_listings(&self) -> StoreResult<Vec<Listing>>;
    fn search_listings(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Listing>>;
    fn listings_owned_by(&self, owner: Uuid) -> StoreResult<Vec<Listing>>;
    fn update_listing(&self, id: Uuid, changes: ListingChanges) -> StoreResult<Option<Listing>>;
    fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>>;

    fn insert_order(&self, order: NewOrder) -> StoreResult<Order>;
    fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    fn list_orders(&self) -> StoreResult<Vec<Order>>;
    fn orders_for_listings(&self, listing_ids: &[Uuid]) -> StoreResult<Vec<Order>>;
    fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>>;
}

/// Escapes LIKE metacharacters so search terms match literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PgPooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl Store for PgStore {
    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(conn)?)
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(conn)
            .optional()?)
    }

    fn find_active_user_by_user_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(users::table
            .filter(users::user_name.eq(user_name))
            .filter(users::active.eq(true))
            .select(User::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<User>> {
        let conn = &mut self.conn()?;
        let mut query = users::table.select(User::as_select()).into_boxed();
        if let Some(term) = search {
            let pattern = like_pattern(term);
            query = query.filter(
                users::first_name
                    .ilike(pattern.clone())
                    .or(users::last_name.ilike(pattern)),
            );
        }
        query = match page.order {
            SortOrder::Ascending => query.order((users::first_name.asc(), users::id.asc())),
            SortOrder::Descending => query.order((users::first_name.desc(), users::id.asc())),
        };
        Ok(query.offset(page.skip()).limit(page.limit()).load(conn)?)
    }

    fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(users::table.find(id))
            .set((changes, users::updated_at.eq(now())))
            .returning(User::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let conn = &mut self.conn()?;
        Ok(diesel::delete(users::table.find(id))
            .returning(User::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn record_user_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        let conn = &mut self.conn()?;
        diesel::update(users::table.find(id))
            .set(users::last_login.eq(Some(at)))
            .execute(conn)?;
        Ok(())
    }

    fn insert_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(customers::table)
            .values(&customer)
            .returning(Customer::as_returning())
            .get_result(conn)?)
    }

    fn find_customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        let conn = &mut self.conn()?;
        Ok(customers::table
            .find(id)
            .select(Customer::as_select())
            .first(conn)
            .optional()?)
    }

    fn find_active_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let conn = &mut self.conn()?;
        Ok(customers::table
            .filter(customers::email.eq(email))
            .filter(customers::active.eq(true))
            .select(Customer::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_customers(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Customer>> {
        let conn = &mut self.conn()?;
        let mut query = customers::table.select(Customer::as_select()).into_boxed();
        if let Some(term) = search {
            let pattern = like_pattern(term);
            query = query.filter(
                customers::first_name
                    .ilike(pattern.clone())
                    .or(customers::last_name.ilike(pattern)),
            );
        }
        query = match page.order {
            SortOrder::Ascending => query.order((customers::first_name.asc(), customers::id.asc())),
            SortOrder::Descending => {
                query.order((customers::first_name.desc(), customers::id.asc()))
            }
        };
        Ok(query.offset(page.skip()).limit(page.limit()).load(conn)?)
    }

    fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> StoreResult<Option<Customer>> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(customers::table.find(id))
            .set((changes, customers::updated_at.eq(now())))
            .returning(Customer::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn delete_customer(&self, id: Uuid) -> StoreResult<bool> {
        let conn = &mut self.conn()?;
        let deleted = diesel::delete(customers::table.find(id)).execute(conn)?;
        Ok(deleted > 0)
    }

    fn record_customer_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        let conn = &mut self.conn()?;
        diesel::update(customers::table.find(id))
            .set(customers::last_login.eq(Some(at)))
            .execute(conn)?;
        Ok(())
    }

    fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(categories::table)
            .values(&category)
            .returning(Category::as_returning())
            .get_result(conn)?)
    }

    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .find(id)
            .select(Category::as_select())
            .first(conn)
            .optional()?)
    }

    fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let conn = &mut self.conn()?;
        Ok(categories::table
            .filter(categories::category_name.eq(name))
            .select(Category::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_categories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Category>> {
        let conn = &mut self.conn()?;
        let mut query = categories::table.select(Category::as_select()).into_boxed();
        if let Some(term) = search {
            query = query.filter(categories::category_name.ilike(like_pattern(term)));
        }
        query = match page.order {
            SortOrder::Ascending => query.order(categories::category_name.asc()),
            SortOrder::Descending => query.order(categories::category_name.desc()),
        };
        Ok(query.offset(page.skip()).limit(page.limit()).load(conn)?)
    }

    fn update_category(&self, id: Uuid, changes: CategoryChanges) -> StoreResult<Option<Category>> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(categories::table.find(id))
            .set((changes, categories::updated_at.eq(now())))
            .returning(Category::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn delete_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let conn = &mut self.conn()?;
        Ok(diesel::delete(categories::table.find(id))
            .returning(Category::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn insert_subcategory(&self, subcategory: Subcategory) -> StoreResult<Subcategory> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(subcategories::table)
            .values(&subcategory)
            .returning(Subcategory::as_returning())
            .get_result(conn)?)
    }

    fn find_subcategory(&self, id: Uuid) -> StoreResult<Option<Subcategory>> {
        let conn = &mut self.conn()?;
        Ok(subcategories::table
            .find(id)
            .select(Subcategory::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_subcategories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Subcategory>> {
        let conn = &mut self.conn()?;
        let mut query = subcategories::table
            .select(Subcategory::as_select())
            .into_boxed();
        if let Some(term) = search {
            query = query.filter(subcategories::subcategory_name.ilike(like_pattern(term)));
        }
        query = match page.order {
            SortOrder::Ascending => query.order(subcategories::subcategory_name.asc()),
            SortOrder::Descending => query.order(subcategories::subcategory_name.desc()),
        };
        Ok(query.offset(page.skip()).limit(page.limit()).load(conn)?)
    }

    fn subcategory_in_use(&self, id: Uuid) -> StoreResult<bool> {
        let conn = &mut self.conn()?;
        Ok(diesel::select(diesel::dsl::exists(
            listings::table.filter(listings::subcategory_id.eq(id)),
        ))
        .get_result(conn)?)
    }

    fn delete_subcategory(&self, id: Uuid) -> StoreResult<bool> {
        let conn = &mut self.conn()?;
        let deleted = diesel::delete(subcategories::table.find(id)).execute(conn)?;
        Ok(deleted > 0)
    }

    fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(listings::table)
            .values(&listing)
            .returning(Listing::as_returning())
            .get_result(conn)?)
    }

    fn find_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let conn = &mut self.conn()?;
        Ok(listings::table
            .find(id)
            .select(Listing::as_select())
            .first(conn)
            .optional()?)
    }

    fn find_listing_by_name(&self, name: &str) -> StoreResult<Option<Listing>> {
        let conn = &mut self.conn()?;
        Ok(listings::table
            .filter(listings::listing_name.eq(name))
            .select(Listing::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let conn = &mut self.conn()?;
        Ok(listings::table
            .select(Listing::as_select())
            .order(listings::created_at.desc())
            .load(conn)?)
    }

    fn search_listings(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Listing>> {
        let conn = &mut self.conn()?;
        let mut query = listings::table.select(Listing::as_select()).into_boxed();
        if let Some(term) = search {
            query = query.filter(listings::listing_name.ilike(like_pattern(term)));
        }
        Ok(query
            .order((listings::created_at.desc(), listings::id.asc()))
            .offset(page.skip())
            .limit(page.limit())
            .load(conn)?)
    }

    fn listings_owned_by(&self, owner: Uuid) -> StoreResult<Vec<Listing>> {
        let conn = &mut self.conn()?;
        Ok(listings::table
            .filter(listings::listing_owner.eq(owner))
            .select(Listing::as_select())
            .order(listings::created_at.desc())
            .load(conn)?)
    }

    fn update_listing(&self, id: Uuid, changes: ListingChanges) -> StoreResult<Option<Listing>> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(listings::table.find(id))
            .set((changes, listings::updated_at.eq(now())))
            .returning(Listing::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let conn = &mut self.conn()?;
        Ok(diesel::delete(listings::table.find(id))
            .returning(Listing::as_returning())
            .get_result(conn)
            .optional()?)
    }

    fn insert_order(&self, order: NewOrder) -> StoreResult<Order> {
        let conn = &mut self.conn()?;
        Ok(diesel::insert_into(orders::table)
            .values(&order)
            .returning(Order::as_returning())
            .get_result(conn)?)
    }

    fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let conn = &mut self.conn()?;
        Ok(orders::table
            .find(id)
            .select(Order::as_select())
            .first(conn)
            .optional()?)
    }

    fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let conn = &mut self.conn()?;
        Ok(orders::table
            .select(Order::as_select())
            .order(orders::created_at.desc())
            .load(conn)?)
    }

    fn orders_for_listings(&self, listing_ids: &[Uuid]) -> StoreResult<Vec<Order>> {
        if listing_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = &mut self.conn()?;
        let ids: Vec<String> = listing_ids.iter().map(Uuid::to_string).collect();
        Ok(orders::table
            .filter(
                sql::<Bool>(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements_text(\
                     CASE jsonb_typeof(order_item -> 'listing_id') \
                     WHEN 'array' THEN order_item -> 'listing_id' \
                     WHEN 'string' THEN jsonb_build_array(order_item -> 'listing_id') \
                     ELSE '[]'::jsonb END) AS booked(id) WHERE booked.id = ANY(",
                )
                .bind::<Array<Text>, _>(ids)
                .sql("))"),
            )
            .select(Order::as_select())
            .order(orders::created_at.desc())
            .load(conn)?)
    }

    fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        let conn = &mut self.conn()?;
        Ok(diesel::update(orders::table.find(id))
            .set((orders::status.eq(status), orders::updated_at.eq(now())))
            .returning(Order::as_returning())
            .get_result(conn)
            .optional()?)
    }
}
