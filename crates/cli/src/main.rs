//! Clientele CLI - Database migrations and store checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the customers and orders tables
//! clientele-cli migrate
//!
//! # Verify connectivity and report collection sizes
//! clientele-cli check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `check` - Ping the record store and count its records

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "clientele-cli")]
#[command(author, version, about = "Clientele CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check record store connectivity and report collection sizes
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Check => commands::check::run().await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["clientele-cli", "migrate"]).map(|cli| cli.command),
            Ok(Commands::Migrate)
        ));
        assert!(matches!(
            Cli::try_parse_from(["clientele-cli", "check"]).map(|cli| cli.command),
            Ok(Commands::Check)
        ));
        assert!(Cli::try_parse_from(["clientele-cli", "seed"]).is_err());
    }
}
