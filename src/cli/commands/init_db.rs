use anyhow::Result;
use business_manager::Config;
use std::time::Duration;

pub async fn handle_init_db(config: &Config) -> Result<()> {
    let pool = crate::cli::open_migrated_pool(config).await?;
    pool.close(Duration::from_secs(5)).await?;

    println!("Database initialised at {}", config.database.url);
    Ok(())
}
