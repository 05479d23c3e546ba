//! Homestay
//!
//! Command-line front end for the listing and reservation workflow engine.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use homestay_core::config::{TransportKind, load_config};
use homestay_core::UserId;

use homestay_engine::cli::property_cmd::{self, PropertyAction};
use homestay_engine::cli::reservation_cmd::{self, ReservationAction};
use homestay_engine::cli::report_cmd::{self, ReportAction};
use homestay_engine::cli::user_cmd::{self, UserAction};
use homestay_engine::cli::{Context, audit_cmd};
use homestay_engine::notifications::{Dispatcher, transport_from_config};
use homestay_engine::storage::Database;
use homestay_engine::workflow::Engine;

#[derive(Parser, Debug)]
#[command(name = "homestay")]
#[command(version, about = "Homestay rental workflow engine")]
struct Args {
    /// User ID to act as; omitted means the anonymous public.
    #[arg(long = "as", global = true, env = "HOMESTAY_AS")]
    as_user: Option<UserId>,

    /// Path to SQLite database file.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory holding `.homestay/settings.json`; defaults to the
    /// current directory.
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Notification transport: log, webhook, smtp or disabled.
    #[arg(long, global = true)]
    notify: Option<TransportKind>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage property listings.
    Property {
        #[command(subcommand)]
        action: PropertyAction,
    },
    /// Manage reservations.
    Reservation {
        #[command(subcommand)]
        action: ReservationAction,
    },
    /// Show the audit trail (administrators).
    Audit {
        /// Only booking entries, with their property IDs.
        #[arg(long)]
        bookings: bool,
    },
    /// Operator reports.
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let project_dir = match args.project_dir.clone() {
        Some(dir) => Some(dir),
        None => std::env::current_dir().ok(),
    };
    let mut config = load_config(project_dir.as_deref())?;
    if let Some(path) = args.db_path.clone() {
        config.database.path = Some(path);
    }
    if let Some(kind) = args.notify {
        config.notifications.transport = kind;
    }
    if args.log_json {
        config.logging.json = true;
    }

    #[cfg(feature = "metrics")]
    let metrics_guard = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => {
            let guard = homestay_core::metrics::init_metrics(&endpoint)?;
            homestay_core::tracing_init::init_tracing_with_otel(
                &config.logging.level,
                config.logging.json,
                &guard,
            );
            Some(guard)
        }
        Err(_) => {
            homestay_core::tracing_init::init_tracing(&config.logging.level, config.logging.json);
            None
        }
    };
    #[cfg(not(feature = "metrics"))]
    homestay_core::tracing_init::init_tracing(&config.logging.level, config.logging.json);

    let db_path = match &config.database.path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %db_path.display(),
        "Opening homestay database"
    );
    let db = Database::open(&db_path, config.database.max_connections).await?;

    let transport = transport_from_config(&config.notifications)?;
    let dispatcher = Dispatcher::new(
        Arc::new(db.clone()),
        transport,
        config.notifications.sender.clone(),
    );
    let engine = Engine::new(&db, &dispatcher, &config.reservations);
    let ctx = Context::new(engine, args.as_user).await?;

    let mut out = io::stdout().lock();
    let result = match args.command {
        Command::User { action } => user_cmd::run(action, &ctx, &mut out).await,
        Command::Property { action } => property_cmd::run(action, &ctx, &mut out).await,
        Command::Reservation { action } => reservation_cmd::run(action, &ctx, &mut out).await,
        Command::Audit { bookings } => audit_cmd::run(bookings, &ctx, &mut out).await,
        Command::Report { action } => report_cmd::run(action, &ctx, &mut out).await,
    };

    #[cfg(feature = "metrics")]
    if let Some(guard) = metrics_guard {
        guard.shutdown()?;
    }

    result
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let data = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine data directory"))?;
    Ok(data.join("homestay").join("homestay.db"))
}
