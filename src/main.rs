use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use trackscout::api::{self, AppState};
use trackscout::config::AppConfig;
use trackscout::logging;

/// Identify audio samples and recommend related tracks
#[derive(Parser, Debug)]
#[command(name = "trackscout", version, about)]
struct Args {
    /// Configuration file (default: trackscout.json if it exists)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Logging configuration file
    #[arg(long = "log-config", visible_alias = "logging-config", value_name = "FILE")]
    log_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Report which credentials are still placeholders and exit
    #[arg(long = "check-config")]
    check_config: bool,
}

fn load_config(args: &Args) -> AppConfig {
    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            eprintln!("Cannot continue without a valid configuration file.");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.apply_environment() {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    config
}

fn check_config(config: &AppConfig) {
    let placeholders = config.placeholder_credentials();
    if placeholders.is_empty() {
        println!("All credentials are configured");
        return;
    }
    println!("Credentials still using placeholder values:");
    for name in placeholders {
        println!("  - {}", name);
    }
}

fn main() {
    let args = Args::parse();

    // Credentials may come from a local .env file
    let dotenv_path = dotenvy::dotenv().ok();

    if let Err(e) = logging::initialize_logging(args.debug, args.verbose, args.log_config.as_deref()) {
        eprintln!("Error: Failed to initialize logging configuration: {}", e);
        std::process::exit(1);
    }

    info!("trackscout {} starting", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let config = load_config(&args);

    if args.check_config {
        check_config(&config);
        return;
    }
    config.warn_about_placeholders();

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rocket::execute(api::start_server(state, &config.webserver)) {
        error!("API server error: {}", e);
        std::process::exit(1);
    }

    info!("Exiting application");
}
