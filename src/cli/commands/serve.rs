use anyhow::{Context, Result};
use business_manager::Config;
use business_manager::http_server::{self, AppState};
use clap::ArgMatches;

pub async fn handle_serve(matches: &ArgMatches, mut config: Config) -> Result<()> {
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }
    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }

    let pool = crate::cli::open_migrated_pool(&config).await?;
    let state = AppState::new(pool);

    http_server::start_server(&config.server, state)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
