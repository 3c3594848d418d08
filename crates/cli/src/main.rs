//! Mery Salud CLI - drive the pharmacy client from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse and fill the cart anonymously
//! merysalud products search paracetamol
//! merysalud cart add 7 --quantity 2
//!
//! # Sign in (the anonymous cart stays local, it is not merged)
//! merysalud login -u maria
//! merysalud checkout --address "Av. Arequipa 123" --district Miraflores
//!
//! # Check what a page would show
//! merysalud navigate /admin/pedidos.html
//! ```
//!
//! # Environment Variables
//!
//! - `MERYSALUD_API_BASE_URL` - Backend base URL (default: `http://localhost:8080/api`)
//! - `MERYSALUD_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `MERYSALUD_PRODUCT_CACHE_TTL_SECS` - Product cache lifetime (default: 300)
//! - `MERYSALUD_STATE_FILE` - Session and cart file (default: `.merysalud/state.json`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `RUST_LOG` - Log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merysalud_client::{FileStore, LogPrompt, PharmacyClient};
use merysalud_core::{OrderId, OrderStatus, ProductId, UserId};

mod commands;
mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "merysalud")]
#[command(author, version, about = "Mery Salud pharmacy client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session
    Login {
        /// Username or email
        #[arg(short, long)]
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        /// Mobile number, 9 digits starting with 9
        #[arg(short, long)]
        telefono: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Evaluate a navigation to a page path
    Navigate {
        /// Page path, e.g. `/mis-pedidos.html`
        path: String,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the cart
    Checkout {
        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        district: Option<String>,

        #[arg(long)]
        reference: Option<String>,
    },
    /// Orders (customer, admin, and delivery views)
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Own account
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Earnings reports (admin)
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List every product
    List,
    /// Search by keyword
    Search { keyword: String },
    /// List a category
    Category { name: String },
    /// Show one product
    Show { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { id: ProductId, quantity: u32 },
    /// Remove a line
    Remove { id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Own orders
    List,
    /// One order
    Show { id: OrderId },
    /// Every order (admin)
    All,
    /// Change an order's status (admin)
    Status { id: OrderId, status: OrderStatus },
    /// Assign a courier (admin)
    Assign { id: OrderId, courier: UserId },
    /// Orders without a courier (admin)
    Unassigned,
    /// Couriers that can take orders (admin)
    Couriers,
    /// Orders assigned to me (delivery)
    Deliveries,
    /// Report delivery progress (delivery)
    Deliver { id: OrderId, status: OrderStatus },
    /// Delivery counters (delivery)
    Stats,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the stored account
    Show,
    /// Change name and/or phone
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Change password (both read from stdin)
    Password,
}

#[derive(Subcommand)]
enum ReportAction {
    /// Earnings for one day
    Daily {
        /// Day as YYYY-MM-DD
        date: chrono::NaiveDate,

        /// Save the Excel export to this file instead of printing a summary
        #[arg(long)]
        export: Option<std::path::PathBuf>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CliConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.client.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logging is not set up yet when configuration fails, so this goes to stderr.
#[allow(clippy::print_stderr)]
fn report_config_error(e: &merysalud_client::ConfigError) {
    eprintln!("Configuration error: {e}");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "merysalud_client=info,merysalud_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(FileStore::new(&config.state_file));
    let client = PharmacyClient::new(&config.client, storage, Arc::new(LogPrompt))?;
    client.restore_session().await?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&client, &username, password).await?;
        }
        Commands::Logout => commands::auth::logout(&client).await?,
        Commands::Register {
            username,
            email,
            telefono,
            password,
        } => commands::auth::register(&client, username, email, telefono, password).await?,
        Commands::Whoami => commands::auth::whoami(&client).await?,
        Commands::Navigate { path } => commands::navigate::run(&client, &path).await,
        Commands::Products { action } => match action {
            ProductsAction::List => commands::catalog::list(&client).await,
            ProductsAction::Search { keyword } => commands::catalog::search(&client, &keyword).await,
            ProductsAction::Category { name } => commands::catalog::category(&client, &name).await,
            ProductsAction::Show { id } => commands::catalog::show(&client, id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&client).await?,
            CartAction::Add { id, quantity } => commands::cart::add(&client, id, quantity).await?,
            CartAction::Set { id, quantity } => {
                commands::cart::set(&client, id, quantity).await?;
            }
            CartAction::Remove { id } => commands::cart::set(&client, id, 0).await?,
            CartAction::Clear => commands::cart::clear(&client).await?,
        },
        Commands::Checkout {
            address,
            district,
            reference,
        } => commands::orders::checkout(&client, address, district, reference).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::mine(&client).await?,
            OrdersAction::Show { id } => commands::orders::show(&client, id).await?,
            OrdersAction::All => commands::orders::all(&client).await?,
            OrdersAction::Status { id, status } => {
                commands::orders::set_status(&client, id, status).await?;
            }
            OrdersAction::Assign { id, courier } => {
                commands::orders::assign(&client, id, courier).await?;
            }
            OrdersAction::Unassigned => commands::orders::unassigned(&client).await?,
            OrdersAction::Couriers => commands::orders::couriers(&client).await?,
            OrdersAction::Deliveries => commands::orders::deliveries(&client).await?,
            OrdersAction::Deliver { id, status } => {
                commands::orders::deliver(&client, id, status).await?;
            }
            OrdersAction::Stats => commands::orders::stats(&client).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&client).await?,
            ProfileAction::Update { name, phone } => {
                commands::profile::update(&client, name.as_deref(), phone.as_deref()).await?;
            }
            ProfileAction::Password => commands::profile::change_password(&client).await?,
        },
        Commands::Report { action } => match action {
            ReportAction::Daily { date, export } => {
                commands::report::daily(&client, date, export.as_deref()).await?;
            }
        },
    }
    Ok(())
}
