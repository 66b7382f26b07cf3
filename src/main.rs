//! conduit CLI (Rust)
//!
//! Talks to a RealWorld Conduit backend. The session and the refresh cookie
//! are kept in the user config directory between invocations.

use anyhow::Result;
use clap::Parser;
use conduit_client::cli::Cli;
use conduit_client::error::AppError;
use conduit_client::{commands, config, routes, Conduit};
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Upper bound for one command, refresh and replay included
const COMMAND_TIMEOUT_SECS: u64 = 120;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    let Some(command) = cli.command else {
        eprintln!("Error: No command specified. Use --help for usage information.");
        std::process::exit(1);
    };

    let config = match config::load_config() {
        Ok(config) => config.with_overrides(cli.api_url, cli.timeout),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(AppError::Config(e.to_string()).exit_code());
        }
    };
    debug!(api_url = %config.api_url, "Loaded configuration");

    let conduit = match Conduit::connect(&config) {
        Ok(conduit) => conduit,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    let result = match timeout(
        Duration::from_secs(COMMAND_TIMEOUT_SECS),
        commands::execute(&conduit, command),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "Command exceeded {} second timeout",
            COMMAND_TIMEOUT_SECS
        ))),
    };

    // Handle result and exit with appropriate code
    match result {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(())
        }
        Err(e) => {
            for message in e.messages() {
                eprintln!("Error: {}", message);
            }
            if let Some(location) = conduit.navigator().redirected_to() {
                let back_to = routes::redirect_target(&location).unwrap_or_else(|| routes::ROOT.to_string());
                eprintln!("Your session has ended. Run `conduit login` to continue at {}.", back_to);
            }
            std::process::exit(e.exit_code());
        }
    }
}
