pub mod commands;

use anyhow::{Context, Result};
use business_manager::Config;
use business_manager::db::{self, DbPool, schema};
use tracing::info;

/// Open the pool and bring the schema up to date
pub async fn open_migrated_pool(config: &Config) -> Result<DbPool> {
    let pool = db::connect(&config.database, &config.pool)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;

    let mut conn = pool.acquire().await?;
    schema::migrate(&mut conn).await.context("Failed to initialise schema")?;
    drop(conn);

    info!("Database ready at {}", config.database.url);
    Ok(pool)
}
