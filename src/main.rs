//! Bursar — admin backend entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Open data stores (env file, points config, user ledger)
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Serve the admin API until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use bursar::bootstrap::logger;
use bursar::core::{config, error};
use bursar::envfile::EnvStore;
use bursar::points::{Ledger, PointsStore};
use bursar::server::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level)?;

    info!(
        service = %config.service_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    std::fs::create_dir_all(&config.work_dir)?;

    let env = EnvStore::open(config.env_file_path())
        .map_err(|e| error::AppError::Config(format!("env file: {e}")))?;
    let points = PointsStore::open(config.points_file_path())
        .map_err(|e| error::AppError::Config(format!("points config: {e}")))?;
    let ledger = Ledger::open(config.users_file_path())
        .map_err(|e| error::AppError::Config(format!("user ledger: {e}")))?;

    info!(
        env_file = %config.env_file_path().display(),
        points_file = %config.points_file_path().display(),
        users_file = %config.users_file_path().display(),
        accounts = ledger.list().len(),
        "stores ready"
    );

    // Shared shutdown token — Ctrl-C cancels it, the server watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let state = AppState {
        service_name: Arc::from(config.service_name.as_str()),
        env: Arc::new(env),
        points: Arc::new(points),
        ledger: Arc::new(ledger),
    };

    server::serve(&config.http.bind, state, shutdown).await
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: bursar [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!(
                    "  -f, --config <PATH>        Path to configuration file (default: config/default.toml)"
                );
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output — the typical default)
    //   -vvv    → debug  (flow-level diagnostics: staging, lookups)
    //   -vvvv+  → trace  (full payload dumps, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs {
        log_level,
        config_path,
    }
}
