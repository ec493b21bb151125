//! Database Migrations
//!
//! Schema migrations embedded at compile time with refinery.

use deadpool_postgres::Pool;
use std::ops::DerefMut;

use crate::database::store::StoreError;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Run all pending migrations
pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    tracing::info!("🔄 Running database migrations...");

    let mut conn = pool.get().await?;
    let client = conn.deref_mut().deref_mut();
    let report = embedded::migrations::runner().run_async(client).await?;

    for migration in report.applied_migrations() {
        tracing::info!("Applied migration {}", migration);
    }

    tracing::info!("✅ Database migrations completed successfully");
    Ok(())
}
