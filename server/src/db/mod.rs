//! Database Layer
//!
//! Storage traits with an in-process and a `PostgreSQL` implementation.

mod memory;
mod models;
mod postgres;
mod store;


use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
pub use store::*;
use tracing::info;

/// Create `PostgreSQL` connection pool with health configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(10)
        // Prevent hanging commands on pool exhaustion
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Open the configured store: `PostgreSQL` when a URL is given, otherwise
/// the in-process store.
pub async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn Store>> {
    match database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
