//! duenotes CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema and session table)
//! duenotes-cli migrate
//!
//! # Send due-date reminders once, outside the server's schedule
//! duenotes-cli reminders scan
//!
//! # Print a fresh VAPID key pair for web push
//! duenotes-cli vapid generate
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `reminders scan` - One-off reminder sweep
//! - `vapid generate` - Generate push signing keys

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "duenotes-cli")]
#[command(author, version, about = "duenotes CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Due-date reminders
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
    /// Web push signing keys
    Vapid {
        #[command(subcommand)]
        action: VapidAction,
    },
}

#[derive(Subcommand)]
enum ReminderAction {
    /// Scan for notes coming due and send push reminders once
    Scan,
}

#[derive(Subcommand)]
enum VapidAction {
    /// Print a new key pair as environment lines
    Generate {
        /// Contact sent with every push request
        #[arg(short, long, default_value = "mailto:admin@localhost")]
        subject: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Reminders { action } => match action {
            ReminderAction::Scan => commands::reminders::scan().await?,
        },
        Commands::Vapid { action } => match action {
            VapidAction::Generate { subject } => commands::vapid::generate(&subject)?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_reminder_scan() {
        let cli = Cli::try_parse_from(["duenotes-cli", "reminders", "scan"]).expect("parses");
        assert!(matches!(
            cli.command,
            Commands::Reminders {
                action: ReminderAction::Scan
            }
        ));
    }

    #[test]
    fn test_parses_vapid_generate() {
        let cli = Cli::try_parse_from(["duenotes-cli", "vapid", "generate"]).expect("parses");
        let Commands::Vapid {
            action: VapidAction::Generate { subject },
        } = cli.command
        else {
            panic!("expected vapid generate");
        };
        assert_eq!(subject, "mailto:admin@localhost");

        let cli = Cli::try_parse_from([
            "duenotes-cli",
            "vapid",
            "generate",
            "-s",
            "https://duenotes.app",
        ])
        .expect("parses");
        assert!(matches!(
            cli.command,
            Commands::Vapid {
                action: VapidAction::Generate { subject }
            } if subject == "https://duenotes.app"
        ));
    }
}
