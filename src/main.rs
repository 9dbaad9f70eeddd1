use business_manager::{Config, logging};
use clap::{Arg, ArgAction, Command};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process;

mod cli;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    let matches = build_cli().get_matches();

    if let Err(e) = run_command(matches).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("business-manager")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Business Manager API - staff, roster, payroll and cash flow")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP server")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .help("Port to listen on (overrides PORT and config)")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Host to bind to (overrides HOST and config)"),
                ),
        )
        .subcommand(
            Command::new("init-db").about("Create the database schema and seed default tax rules"),
        )
        .subcommand(
            Command::new("status")
                .about("Check database connectivity and pool health")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the status as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .help("Database connection string (overrides DATABASE_URL and config)")
                .global(true),
        )
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .help("Directory containing config.toml")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
}

async fn run_command(matches: clap::ArgMatches) -> anyhow::Result<()> {
    let mut config = match matches.get_one::<PathBuf>("config-dir") {
        Some(dir) => Config::load_from_dir(dir)?,
        None => Config::load()?,
    };
    if let Some(url) = matches.get_one::<String>("database-url") {
        config.database.url = url.clone();
    }

    logging::init_logging(&config.logging)?;

    match matches.subcommand() {
        Some(("serve", sub_matches)) => {
            cli::commands::serve::handle_serve(sub_matches, config).await?
        }
        Some(("init-db", _)) => cli::commands::init_db::handle_init_db(&config).await?,
        Some(("status", sub_matches)) => {
            cli::commands::status::handle_status(sub_matches, &config).await?
        }
        Some((other, _)) => anyhow::bail!("unknown command {:?}", other),
        None => anyhow::bail!("no command given"),
    }

    Ok(())
}
