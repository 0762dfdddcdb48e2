//! Tavola CLI - database migrations, catalog seeding and staff accounts.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! tavola migrate
//!
//! # Upsert the language and role catalogs
//! tavola seed
//! tavola seed --file ./my-catalog.yaml
//!
//! # Create the first platform administrator
//! TAVOLA_USER_PASSWORD=... tavola user create -e admin@tavola.app -n "Ana Souza" -r super_admin
//!
//! # Create a restaurant-bound user
//! tavola user create -u garcom1 -n "João" --restaurant 4 -r waiter -l 10 -l 11
//! ```
//!
//! # Environment Variables
//!
//! - `TAVOLA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `TAVOLA_USER_PASSWORD` - Password for `user create` when `--password` is omitted

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tavola")]
#[command(author, version, about = "Tavola CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert the global language and role catalogs
    Seed {
        /// YAML catalog file (defaults to the bundled catalog)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage staff users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a staff user
    Create {
        /// Login email address
        #[arg(short, long)]
        email: Option<String>,

        /// Login username
        #[arg(short, long)]
        username: Option<String>,

        /// Full name
        #[arg(short, long)]
        name: String,

        /// Password (read from `TAVOLA_USER_PASSWORD` when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Restaurant the user belongs to
        #[arg(long)]
        restaurant: Option<i32>,

        /// Role name, e.g. `super_admin` or `waiter`
        #[arg(short, long)]
        role: String,

        /// Location the role applies to (repeatable)
        #[arg(short, long = "location")]
        locations: Vec<i32>,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Seed { file } => {
            let catalog = commands::seed::Catalog::load(file.as_deref())?;
            commands::seed::run(&catalog).await?;
        }
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                username,
                name,
                password,
                restaurant,
                role,
                locations,
            } => {
                let request = commands::user::CreateUser {
                    email,
                    username,
                    full_name: name,
                    password: commands::user::password_from(password)?,
                    restaurant_id: restaurant,
                    role: role.parse()?,
                    location_ids: locations,
                };
                let user_id = commands::user::create(&request).await?;
                tracing::info!(%user_id, "Done");
            }
        },
    }
    Ok(())
}
