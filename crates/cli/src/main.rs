//! RedThread CLI - storefront, checkout and delivery driver commands.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the session is persisted in the local cache)
//! rt-cli auth login -e ana@redthread.cl -p 'Secreta1!'
//!
//! # Browse and fill the cart
//! rt-cli catalog products
//! rt-cli cart add 42 -q 2
//! rt-cli checkout --address 3
//!
//! # Driver workflow (the claimed route lives for one process, so use the shell)
//! rt-cli shell
//! rt> driver claim 5
//! rt> driver stage entregar
//! rt> driver deliver 501 --receiver "Ana Soto" --photo entrega.jpg
//! ```
//!
//! # Commands
//!
//! - `auth` - Register, log in and manage the profile
//! - `catalog` - Browse products, sync the offline cache, admin writes
//! - `cart` - Show and edit the cart
//! - `checkout` - Place an order
//! - `orders` - Order history and local order snapshots
//! - `address` - Address book
//! - `driver` - Claim a route and report shipments
//! - `routes` - Create routes and manage local route snapshots (admin)
//! - `shell` - Run commands against one long-lived client

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use redthread_client::{AppState, ClientConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    AddressAction, AuthAction, CartAction, CatalogAction, DriverAction, OrdersAction,
    RoutesAction,
};

#[derive(Parser)]
#[command(name = "rt-cli")]
#[command(author, version, about = "RedThread storefront and delivery client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account and session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Products, categories and the offline cache
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Guest or server cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout {
        /// Address ID (defaults to the default address)
        #[arg(short, long)]
        address: Option<i64>,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Address book
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Delivery driver workflow
    Driver {
        #[command(subcommand)]
        action: DriverAction,
    },
    /// Route administration
    Routes {
        #[command(subcommand)]
        action: RoutesAction,
    },
    /// Read commands from stdin, keeping cart and route state between them
    Shell,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "redthread_client=info,redthread_cli=info".into());
    let json = std::env::var("RT_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let config = ClientConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = AppState::connect(config).await?;

    match cli.command {
        Commands::Shell => commands::shell::run(&app).await?,
        command => dispatch(&app, command).await?,
    }
    Ok(())
}

async fn dispatch(app: &AppState, command: Commands) -> Result<(), commands::CommandError> {
    match command {
        Commands::Auth { action } => commands::auth::run(app, action).await,
        Commands::Catalog { action } => commands::catalog::run(app, action).await,
        Commands::Cart { action } => commands::cart::run(app, action).await,
        Commands::Checkout { address } => commands::cart::checkout(app, address).await,
        Commands::Orders { action } => commands::orders::run(app, action).await,
        Commands::Address { action } => commands::address::run(app, action).await,
        Commands::Driver { action } => commands::driver::run(app, action).await,
        Commands::Routes { action } => commands::driver::routes(app, action).await,
        Commands::Shell => Err(commands::CommandError::Input(
            "already in a shell".to_string(),
        )),
    }
}
