//! Timebank - operator CLI for the skill-exchange marketplace
//!
//! - `timebank serve` runs the REST API
//! - `timebank user`, `grant`, `skills`, `exchanges` inspect and administer
//!   the database directly

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use timebank_core::{constants, MarketConfig};

mod admin;
mod serve;

/// Timebank - skill-exchange time-credit marketplace
#[derive(Parser)]
#[command(name = "timebank")]
#[command(about = "Skill-exchange marketplace with a time-credit ledger", long_about = None)]
struct Cli {
    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = constants::server::DEFAULT_PORT)]
        port: u16,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Mint credits into a user's balance
    Grant {
        username: String,
        amount: i64,
    },

    /// Browse listed skills
    Skills {
        #[command(subcommand)]
        command: SkillsCommand,
    },

    /// Inspect exchanges
    Exchanges {
        #[command(subcommand)]
        command: ExchangesCommand,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user and print their bearer token
    Add {
        username: String,
        email: String,
        /// Credits per hour charged under the provider-rate policy
        #[arg(long)]
        rate: Option<i64>,
    },
    /// List every user with balance and rate
    List,
    /// Show a user's profile, balance and recent credit movements
    Show { username: String },
    /// Revoke a user's tokens and issue a new one
    Token { username: String },
}

#[derive(Subcommand)]
pub enum SkillsCommand {
    /// Filter skills by text, category and difficulty
    Search {
        /// Case-insensitive text matched against title and description
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        difficulty: Option<String>,
        /// Only skills offered by this username
        #[arg(long)]
        provider: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExchangesCommand {
    /// List exchanges, newest first
    List {
        /// Only exchanges this username is a party to
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = MarketConfig::load()?;
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    match cli.command {
        Commands::Serve { port } => serve::run(port, config).await,
        Commands::User { command } => admin::user(&config, command),
        Commands::Grant { username, amount } => admin::grant(&config, &username, amount),
        Commands::Skills { command } => admin::skills(&config, command),
        Commands::Exchanges { command } => admin::exchanges(&config, command),
    }
}
