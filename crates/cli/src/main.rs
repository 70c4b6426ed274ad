//! Clover CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! clover-cli migrate
//!
//! # Seed the database with a starter catalog and a staff user
//! clover-cli seed
//!
//! # Create a user
//! clover-cli user create -u alice -e alice@example.com -p "a strong password"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with sample data
//! - `user create` - Create users from the command line

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "clover-cli")]
#[command(author, version, about = "Clover Goods CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with a starter catalog and a staff user
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (hashed before storage)
        #[arg(short, long)]
        password: String,

        /// First name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Last name
        #[arg(long, default_value = "")]
        last_name: String,
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
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                first_name,
                last_name,
            } => {
                commands::user::create(&username, &email, &password, &first_name, &last_name)
                    .await?;
            }
        },
    }
    Ok(())
}
