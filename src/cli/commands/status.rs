use anyhow::Result;
use business_manager::Config;
use business_manager::db;
use business_manager::health::{HealthService, HealthStatus};
use clap::ArgMatches;
use std::time::Duration;

pub async fn handle_status(matches: &ArgMatches, config: &Config) -> Result<()> {
    let pool = db::connect(&config.database, &config.pool).await?;
    let status = HealthService::new(pool.clone()).detailed_status().await;
    let url = pool.manager().url().to_string();
    pool.close(Duration::from_secs(5)).await?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let pool_health = &status.database.connection_pool;
        println!("Business Manager status: {:?}", status.status);
        println!("  database:   {}", url);
        println!("  latency:    {} ms", status.database.latency_ms);
        println!(
            "  pool:       {} open, {} idle, {} lent (max {})",
            pool_health.size, pool_health.idle, pool_health.active, pool_health.max
        );
        if let Some(message) = &status.database.message {
            println!("  message:    {}", message);
        }
    }

    if status.status == HealthStatus::Unhealthy {
        anyhow::bail!("database is unhealthy");
    }
    Ok(())
}
