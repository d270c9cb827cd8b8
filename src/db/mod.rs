pub mod connection;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::{init_pool, run_migrations, PgPool};
pub use memory::MemoryStore;
pub use models::*;
pub use repository::{PgStore, Store, StoreError, StoreResult};
