diesel::table! {
    users (id) {
        id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Varchar,
        user_name -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        active -> Bool,
        last_login -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    customers (id) {
        id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        valid_account -> Bool,
        active -> Bool,
        last_login -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    categories (id) {
        id -> Uuid,
        category_name -> Varchar,
        category_icon -> Varchar,
        active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    subcategories (id) {
        id -> Uuid,
        subcategory_name -> Varchar,
        category_id -> Uuid,
        active -> Bool,
    }
}

diesel::table! {
    listings (id) {
        id -> Uuid,
        listing_owner -> Uuid,
        listing_name -> Varchar,
        city -> Nullable<Varchar>,
        province -> Nullable<Varchar>,
        category_id -> Uuid,
        subcategory_id -> Nullable<Uuid>,
        short_description -> Nullable<Text>,
        long_description -> Nullable<Text>,
        price -> Nullable<Float8>,
        active -> Bool,
        bed -> Nullable<Int4>,
        room -> Nullable<Int4>,
        max_guests -> Nullable<Int4>,
        listing_image -> Array<Text>,
        status -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        customer_id -> Uuid,
        order_item -> Jsonb,
        status -> Varchar,
        order_date -> Timestamp,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(subcategories -> categories (category_id));
diesel::joinable!(listings -> categories (category_id));
diesel::joinable!(listings -> customers (listing_owner));
diesel::joinable!(orders -> customers (customer_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    customers,
    categories,
    subcategories,
    listings,
    orders,
);
