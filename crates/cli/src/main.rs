//! Cornershop CLI - Database management and the terminal cart.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (including the session table)
//! shop-cli migrate
//!
//! # Seed categories, demo users, and 100 products
//! shop-cli seed
//!
//! # Create or promote an admin
//! shop-cli admin create -e admin@example.com -n "Admin Name" -p "long password"
//! shop-cli admin promote -e someone@example.com
//!
//! # Terminal cart against a running storefront
//! shop-cli cart add 12 -q 2
//! shop-cli cart set 12 5
//! shop-cli cart show
//! shop-cli cart checkout -e test@example.com -p password
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with demo data
//! - `admin` - Manage admin users
//! - `cart` - Local cart and checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cornershop_core::ProductId;

mod api;
mod commands;
mod storage;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Cornershop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with categories, demo users, and products
    Seed {
        /// Number of products to generate
        #[arg(long, default_value_t = 100)]
        products: usize,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage the local cart and check out
    Cart {
        /// File the cart is persisted to
        #[arg(long, env = "SHOP_CART_FILE", default_value = ".cornershop-cart.json")]
        file: PathBuf,

        /// Storefront base URL
        #[arg(long, env = "SHOP_API_URL", default_value = "http://127.0.0.1:3000")]
        api_url: String,

        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin password
        #[arg(short, long, env = "SHOP_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Give an existing account admin rights
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product, looked up from the storefront
    Add {
        product_id: ProductId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product's line
    Remove { product_id: ProductId },
    /// Set a line's quantity (0 or less removes it)
    Set {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Log in and place an order for the cart
    Checkout {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SHOP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

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
        Commands::Seed { products } => commands::seed::run(products).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Cart {
            file,
            api_url,
            action,
        } => {
            let mut cart = commands::cart::CartCommand::open(file, &api_url)?;
            match action {
                CartAction::Show => cart.show(),
                CartAction::Add {
                    product_id,
                    quantity,
                } => cart.add(product_id, quantity).await?,
                CartAction::Remove { product_id } => cart.remove(product_id)?,
                CartAction::Set {
                    product_id,
                    quantity,
                } => cart.set(product_id, quantity)?,
                CartAction::Clear => cart.clear()?,
                CartAction::Checkout { email, password } => {
                    cart.checkout(&email, &password).await?;
                }
            }
        }
    }
    Ok(())
}
