//! Mercurios CLI - Database migrations and manual sync runs.
//!
//! # Usage
//!
//! ```bash
//! # Run sync schema migrations
//! mercurios migrate
//!
//! # Reconcile every storefront customer (full batch)
//! mercurios sync customers
//!
//! # One POS voucher poll cycle (issuance + redemption)
//! mercurios sync vouchers
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sync customers` - Page through the storefront and reconcile all customers
//! - `sync vouchers` - Import changed POS vouchers and apply redemptions

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mercurios")]
#[command(author, version, about = "Mercurios sync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Run a reconciliation manually
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
}

#[derive(Subcommand)]
enum SyncTarget {
    /// Reconcile every storefront customer (full batch)
    Customers,
    /// One POS voucher poll cycle (issuance + redemption)
    Vouchers,
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
        Commands::Sync { target } => match target {
            SyncTarget::Customers => commands::sync::customers().await?,
            SyncTarget::Vouchers => commands::sync::vouchers().await?,
        },
    }
    Ok(())
}
