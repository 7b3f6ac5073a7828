use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, error};

use gator::{AppState, CommandTable, Config, Database};

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("usage: gator <command> [args...]");
        eprintln!("commands: {}", CommandTable::new().names().join(", "));
        return ExitCode::FAILURE;
    };
    let args: Vec<String> = args.collect();

    // Load configuration
    let config_path = match Config::default_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut config = match Config::load_or_create(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };
    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }
    debug!("Using config file {}", config_path.display());

    let db = match Database::open(&config.db_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Cannot open database: {}", e);
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let table = CommandTable::new();
    let mut state = AppState::new(db.clone(), config, config_path);
    let mut stdout = std::io::stdout();
    let result = table.dispatch(&mut state, &command, &args, &mut stdout).await;
    db.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
