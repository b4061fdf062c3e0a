//! Storeline CLI - Database migrations, seeding and development tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sl-cli migrate
//!
//! # Load catalog products from YAML
//! sl-cli seed products data/products.yaml
//!
//! # Mint a bearer token for local testing
//! sl-cli token --user-id 6f1c0e0e-3b1a-4c55-9d7e-2f1f4f0b8a11 --email dev@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Insert catalog products from a YAML file
//! - `token` - Issue a development JWT signed with `JWT_SECRET`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sl-cli")]
#[command(author, version, about = "Storeline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Issue a development access token
    Token {
        /// User id to place in the `sub` claim
        #[arg(short, long)]
        user_id: uuid::Uuid,

        /// Email to place in the `email` claim
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,
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
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
        Commands::Token { user_id, email } => commands::token::issue(user_id, &email)?,
    }
    Ok(())
}
