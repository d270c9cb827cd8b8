use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::db::models::*;
use crate::db::repository::{Store, StoreError, StoreResult};
use crate::pagination::{Page, SortOrder};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    customers: Vec<Customer>,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    listings: Vec<Listing>,
    orders: Vec<Order>,
}

/// A process-local [`Store`] with the same uniqueness and reference rules as the
/// PostgreSQL schema. Used by the test-suite and for running without a
/// database.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn ordered(order: SortOrder, a: &str, b: &str) -> Ordering {
    match order {
        SortOrder::Ascending => a.cmp(b),
        SortOrder::Descending => b.cmp(a),
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

impl Store for MemoryStore {
    fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.write();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(conflict("users_email_key"));
        }
        if tables.users.iter().any(|u| u.user_name == user.user_name) {
            return Err(conflict("users_user_name_key"));
        }
        let user = User::from(user);
        tables.users.push(user.clone());
        Ok(user)
    }

    fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    fn find_active_user_by_user_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.user_name == user_name && u.active)
            .cloned())
    }

    fn list_users(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<User>> {
        let tables = self.read();
        let mut found: Vec<User> = tables
            .users
            .iter()
            .filter(|u| {
                search.map_or(true, |term| {
                    contains_ci(&u.first_name, term) || contains_ci(&u.last_name, term)
                })
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| ordered(page.order, &a.first_name, &b.first_name));
        Ok(page.slice(&found))
    }

    fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut tables = self.write();
        if let Some(email) = &changes.email {
            if tables.users.iter().any(|u| u.id != id && u.email == *email) {
                return Err(conflict("users_email_key"));
            }
        }
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(value) = changes.first_name {
            user.first_name = value;
        }
        if let Some(value) = changes.last_name {
            user.last_name = value;
        }
        if let Some(value) = changes.email {
            user.email = value;
        }
        if let Some(value) = changes.role {
            user.role = value;
        }
        if let Some(value) = changes.active {
            user.active = value;
        }
        user.updated_at = now();
        Ok(Some(user.clone()))
    }

    fn delete_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut tables = self.write();
        let position = tables.users.iter().position(|u| u.id == id);
        Ok(position.map(|index| tables.users.remove(index)))
    }

    fn record_user_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        if let Some(user) = self.write().users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    fn insert_customer(&self, customer: NewCustomer) -> StoreResult<Customer> {
        let mut tables = self.write();
        if tables.customers.iter().any(|c| c.email == customer.email) {
            return Err(conflict("customers_email_key"));
        }
        let customer = Customer::from(customer);
        tables.customers.push(customer.clone());
        Ok(customer)
    }

    fn find_customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self.read().customers.iter().find(|c| c.id == id).cloned())
    }

    fn find_active_customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        Ok(self
            .read()
            .customers
            .iter()
            .find(|c| c.email == email && c.active)
            .cloned())
    }

    fn list_customers(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Customer>> {
        let tables = self.read();
        let mut found: Vec<Customer> = tables
            .customers
            .iter()
            .filter(|c| {
                search.map_or(true, |term| {
                    contains_ci(&c.first_name, term) || contains_ci(&c.last_name, term)
                })
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| ordered(page.order, &a.first_name, &b.first_name));
        Ok(page.slice(&found))
    }

    fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> StoreResult<Option<Customer>> {
        let mut tables = self.write();
        if let Some(email) = &changes.email {
            if tables.customers.iter().any(|c| c.id != id && c.email == *email) {
                return Err(conflict("customers_email_key"));
            }
        }
        let Some(customer) = tables.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(value) = changes.first_name {
            customer.first_name = value;
        }
        if let Some(value) = changes.last_name {
            customer.last_name = value;
        }
        if let Some(value) = changes.email {
            customer.email = value;
        }
        if let Some(value) = changes.valid_account {
            customer.valid_account = value;
        }
        if let Some(value) = changes.active {
            customer.active = value;
        }
        customer.updated_at = now();
        Ok(Some(customer.clone()))
    }

    fn delete_customer(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write();
        let before = tables.customers.len();
        tables.customers.retain(|c| c.id != id);
        Ok(tables.customers.len() < before)
    }

    fn record_customer_login(&self, id: Uuid, at: NaiveDateTime) -> StoreResult<()> {
        if let Some(customer) = self.write().customers.iter_mut().find(|c| c.id == id) {
            customer.last_login = Some(at);
        }
        Ok(())
    }

    fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.write();
        if tables
            .categories
            .iter()
            .any(|c| c.category_name == category.category_name)
        {
            return Err(conflict("categories_category_name_key"));
        }
        let category = Category::from(category);
        tables.categories.push(category.clone());
        Ok(category)
    }

    fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.read().categories.iter().find(|c| c.id == id).cloned())
    }

    fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .read()
            .categories
            .iter()
            .find(|c| c.category_name == name)
            .cloned())
    }

    fn list_categories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Category>> {
        let tables = self.read();
        let mut found: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| search.map_or(true, |term| contains_ci(&c.category_name, term)))
            .cloned()
            .collect();
        found.sort_by(|a, b| ordered(page.order, &a.category_name, &b.category_name));
        Ok(page.slice(&found))
    }

    fn update_category(&self, id: Uuid, changes: CategoryChanges) -> StoreResult<Option<Category>> {
        let mut tables = self.write();
        if let Some(name) = &changes.category_name {
            if tables
                .categories
                .iter()
                .any(|c| c.id != id && c.category_name == *name)
            {
                return Err(conflict("categories_category_name_key"));
            }
        }
        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(value) = changes.category_name {
            category.category_name = value;
        }
        if let Some(value) = changes.category_icon {
            category.category_icon = value;
        }
        if let Some(value) = changes.active {
            category.active = value;
        }
        category.updated_at = now();
        Ok(Some(category.clone()))
    }

    fn delete_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let mut tables = self.write();
        let position = tables.categories.iter().position(|c| c.id == id);
        Ok(position.map(|index| tables.categories.remove(index)))
    }

    fn insert_subcategory(&self, subcategory: Subcategory) -> StoreResult<Subcategory> {
        let mut tables = self.write();
        if tables
            .subcategories
            .iter()
            .any(|s| s.subcategory_name == subcategory.subcategory_name)
        {
            return Err(conflict("subcategories_subcategory_name_key"));
        }
        tables.subcategories.push(subcategory.clone());
        Ok(subcategory)
    }

    fn find_subcategory(&self, id: Uuid) -> StoreResult<Option<Subcategory>> {
        Ok(self.read().subcategories.iter().find(|s| s.id == id).cloned())
    }

    fn list_subcategories(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Subcategory>> {
        let tables = self.read();
        let mut found: Vec<Subcategory> = tables
            .subcategories
            .iter()
            .filter(|s| search.map_or(true, |term| contains_ci(&s.subcategory_name, term)))
            .cloned()
            .collect();
        found.sort_by(|a, b| ordered(page.order, &a.subcategory_name, &b.subcategory_name));
        Ok(page.slice(&found))
    }

    fn subcategory_in_use(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .read()
            .listings
            .iter()
            .any(|l| l.subcategory_id == Some(id)))
    }

    fn delete_subcategory(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write();
        if tables.listings.iter().any(|l| l.subcategory_id == Some(id)) {
            return Err(conflict("listings_subcategory_id_fkey"));
        }
        let before = tables.subcategories.len();
        tables.subcategories.retain(|s| s.id != id);
        Ok(tables.subcategories.len() < before)
    }

    fn insert_listing(&self, listing: NewListing) -> StoreResult<Listing> {
        let mut tables = self.write();
        if tables
            .listings
            .iter()
            .any(|l| l.listing_name == listing.listing_name)
        {
            return Err(conflict("listings_listing_name_key"));
        }
        let listing = Listing::from(listing);
        tables.listings.push(listing.clone());
        Ok(listing)
    }

    fn find_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        Ok(self.read().listings.iter().find(|l| l.id == id).cloned())
    }

    fn find_listing_by_name(&self, name: &str) -> StoreResult<Option<Listing>> {
        Ok(self
            .read()
            .listings
            .iter()
            .find(|l| l.listing_name == name)
            .cloned())
    }

    fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        // Newest first; insertion order breaks timestamp ties.
        Ok(self.read().listings.iter().rev().cloned().collect())
    }

    fn search_listings(&self, search: Option<&str>, page: Page) -> StoreResult<Vec<Listing>> {
        let tables = self.read();
        let found: Vec<Listing> = tables
            .listings
            .iter()
            .rev()
            .filter(|l| search.map_or(true, |term| contains_ci(&l.listing_name, term)))
            .cloned()
            .collect();
        Ok(page.slice(&found))
    }

    fn listings_owned_by(&self, owner: Uuid) -> StoreResult<Vec<Listing>> {
        Ok(self
            .read()
            .listings
            .iter()
            .rev()
            .filter(|l| l.listing_owner == owner)
            .cloned()
            .collect())
    }

    fn update_listing(&self, id: Uuid, changes: ListingChanges) -> StoreResult<Option<Listing>> {
        let mut tables = self.write();
        if let Some(name) = &changes.listing_name {
            if tables
                .listings
                .iter()
                .any(|l| l.id != id && l.listing_name == *name)
            {
                return Err(conflict("listings_listing_name_key"));
            }
        }
        let Some(listing) = tables.listings.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        changes.apply(listing);
        listing.updated_at = now();
        Ok(Some(listing.clone()))
    }

    fn delete_listing(&self, id: Uuid) -> StoreResult<Option<Listing>> {
        let mut tables = self.write();
        let position = tables.listings.iter().position(|l| l.id == id);
        Ok(position.map(|index| tables.listings.remove(index)))
    }

    fn insert_order(&self, order: NewOrder) -> StoreResult<Order> {
        let order = Order::from(order);
        self.write().orders.push(order.clone());
        Ok(order)
    }

    fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.read().orders.iter().find(|o| o.id == id).cloned())
    }

    fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.read().orders.iter().rev().cloned().collect())
    }

    fn orders_for_listings(&self, listing_ids: &[Uuid]) -> StoreResult<Vec<Order>> {
        Ok(self
            .read()
            .orders
            .iter()
            .rev()
            .filter(|o| o.books_any(listing_ids))
            .cloned()
            .collect())
    }

    fn update_order_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        let mut tables = self.write();
        let Some(order) = tables.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.status = status;
        order.updated_at = now();
        Ok(Some(order.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer(email: &str) -> NewCustomer {
        NewCustomer::register("Ada".into(), "Lovelace".into(), email.into(), "hash".into())
    }

    fn category(name: &str) -> NewCategory {
        NewCategory {
            id: Uuid::new_v4(),
            category_name: name.into(),
            category_icon: "mdi:home".into(),
            active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn listing(owner: Uuid, category_id: Uuid, name: &str) -> NewListing {
        NewListing {
            id: Uuid::new_v4(),
            listing_owner: owner,
            listing_name: name.into(),
            city: None,
            province: None,
            category_id,
            subcategory_id: None,
            short_description: None,
            long_description: None,
            price: Some(80.0),
            active: true,
            bed: None,
            room: None,
            max_guests: None,
            listing_image: vec!["a.jpg".into()],
            status: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_customer(customer("a@b.com")).unwrap();
        let err = store.insert_customer(customer("a@b.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref c) if c == "customers_email_key"));
    }

    #[test]
    fn inactive_customers_are_not_found_by_email() {
        let store = MemoryStore::new();
        let created = store.insert_customer(customer("a@b.com")).unwrap();
        store
            .update_customer(
                created.id,
                CustomerChanges {
                    active: Some(false),
                    ..CustomerChanges::default()
                },
            )
            .unwrap();
        assert!(store.find_active_customer_by_email("a@b.com").unwrap().is_none());
    }

    #[test]
    fn categories_page_and_sort_by_name() {
        let store = MemoryStore::new();
        for name in ["b", "d", "a", "c"] {
            store.insert_category(category(name)).unwrap();
        }
        let names = |order| {
            store
                .list_categories(None, Page::first(order))
                .unwrap()
                .into_iter()
                .map(|c| c.category_name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(SortOrder::Ascending), vec!["a", "b", "c", "d"]);
        assert_eq!(names(SortOrder::Descending), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn host_orders_follow_listing_ids() {
        let store = MemoryStore::new();
        let host = store.insert_customer(customer("host@b.com")).unwrap();
        let cabins = store.insert_category(category("Cabins")).unwrap();
        let mine = store.insert_listing(listing(host.id, cabins.id, "Lake cabin")).unwrap();
        let other = Uuid::new_v4();

        store
            .insert_order(NewOrder::pending(
                Uuid::new_v4(),
                json!({ "listing_id": mine.id.to_string() }),
            ))
            .unwrap();
        store
            .insert_order(NewOrder::pending(
                Uuid::new_v4(),
                json!({ "listing_id": other.to_string() }),
            ))
            .unwrap();

        store
            .insert_order(NewOrder::pending(
                Uuid::new_v4(),
                json!({ "listing_id": [other.to_string(), mine.id.to_string()] }),
            ))
            .unwrap();

        let found = store.orders_for_listings(&[mine.id]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].listing_ids(), vec![other, mine.id]);
        assert_eq!(found[1].listing_ids(), vec![mine.id]);
    }

    #[test]
    fn renaming_a_listing_onto_another_is_a_conflict() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let cabins = store.insert_category(category("Cabins")).unwrap();
        store.insert_listing(listing(owner, cabins.id, "One")).unwrap();
        let two = store.insert_listing(listing(owner, cabins.id, "Two")).unwrap();
        let err = store
            .update_listing(
                two.id,
                ListingChanges {
                    listing_name: Some("One".into()),
                    ..ListingChanges::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn referenced_subcategory_is_restricted() {
        let store = MemoryStore::new();
        let cabins = store.insert_category(category("Cabins")).unwrap();
        let lakeside = store
            .insert_subcategory(Subcategory {
                id: Uuid::new_v4(),
                subcategory_name: "Lakeside".into(),
                category_id: cabins.id,
                active: true,
            })
            .unwrap();
        let mut cabin = listing(Uuid::new_v4(), cabins.id, "Lake cabin");
        cabin.subcategory_id = Some(lakeside.id);
        store.insert_listing(cabin).unwrap();

        assert!(store.subcategory_in_use(lakeside.id).unwrap());
        let err = store.delete_subcategory(lakeside.id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref c) if c == "listings_subcategory_id_fkey"));
        assert!(store.find_subcategory(lakeside.id).unwrap().is_some());
    }
}
