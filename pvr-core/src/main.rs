//! pvrd: DVR coordination daemon.
//!
//! Opens the channel store, builds the orchestrator and runs the
//! background update loop until told to quit on stdin.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use pvr_core::config::{Config, ConfigFile};
use pvr_core::logging;
use pvr_core::orchestrator::Orchestrator;
use pvr_core::store::Store;

/// pvrd - DVR coordination daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the channel database file
    #[arg(short, long, default_value = "pvr.db")]
    database: PathBuf,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("pvrd.toml");
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    });
    let file_config = if let Some(config_path) = &config_path {
        match ConfigFile::load(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };

    let mut config = Config::from_file(&file_config);

    // Command line takes precedence over file values
    if args.database.to_string_lossy() != "pvr.db" {
        config.store_path = args.database.clone();
    }
    if args.log_dir.to_string_lossy() != "logs" {
        config.log_dir = args.log_dir.clone();
    }
    if args.log_retention_days != 7 {
        config.log_retention_days = args.log_retention_days;
    }

    logging::init_logging(
        &config.log_dir,
        config.log_retention_days,
        args.verbose,
        config.log_level.as_deref(),
    )
    .expect("Failed to initialize logging");

    info!("Opening channel store: {:?}", config.store_path);
    let store = match Store::open(&config.store_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open channel store: {}", e);
            return Err(e.into());
        }
    };

    let orchestrator = Arc::new(Orchestrator::new(config, store));
    if let Err(e) = orchestrator.initialize() {
        error!("Initialization failed: {}", e);
        return Err(e.into());
    }
    orchestrator.start();
    info!("pvrd running; type 'quit' to stop");

    // Block on stdin; EOF or 'quit' shuts the daemon down
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(cmd) if cmd.trim() == "quit" || cmd.trim() == "exit" => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }

    info!("Shutting down");
    orchestrator.stop();
    Ok(())
}
