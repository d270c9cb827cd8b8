use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tracing::info;

use crate::config::Settings;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to create pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("failed to run migrations: {0}")]
    Migration(String),
}

/// Opens the pool described by `settings`. The pool lives inside the
/// application state and is closed when the last handle drops at shutdown.
pub fn init_pool(settings: &Settings) -> Result<PgPool, ConnectionError> {
    let manager = ConnectionManager::<PgConnection>::new(settings.database_url.as_str());
    let pool = Pool::builder()
        .max_size(settings.database_pool_size)
        .connection_timeout(Duration::from_secs(settings.database_timeout_seconds))
        .build(manager)?;
    info!(pool_size = settings.database_pool_size, "database pool ready");
    Ok(pool)
}

pub fn run_migrations(pool: &PgPool) -> Result<(), ConnectionError> {
    let conn = &mut pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| ConnectionError::Migration(err.to_string()))?;
    info!(applied = applied.len(), "database migrations applied");
    Ok(())
}
