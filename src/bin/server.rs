use std::{
    fs::OpenOptions,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use kiosk_atm::{
    AppState, AtmConfig, DEFAULT_WITHDRAWAL_FEE, DevicePrinter, LogPrinter, Money, ReceiptSink,
    StdinConsole, build_router, graceful_shutdown, logging_middleware, open_db,
    run_event_dispatcher, spawn_event_poller,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The backend for the kiosk ATM.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "atm.db")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// The fee charged on every withdrawal, in major currency units.
    #[arg(long, default_value_t = DEFAULT_WITHDRAWAL_FEE.as_major_units())]
    withdrawal_fee: f64,

    /// The opening balance for cards registered by the legacy card tap.
    #[arg(long, default_value_t = 100.0)]
    default_balance: f64,

    /// The number of transactions listed when the client does not ask for a
    /// specific number.
    #[arg(long, default_value_t = 10)]
    history_limit: u32,

    /// Register unknown cards with the default balance when they are tapped
    /// on the legacy `/rfid/{tag}` route.
    #[arg(long)]
    allow_card_provisioning: bool,

    /// The receipt printer device, e.g. `/dev/ttyUSB0`. Receipts are written
    /// to the log if no printer is given.
    #[arg(long)]
    printer_device: Option<String>,

    /// How long to wait for the printer, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    receipt_timeout_ms: u64,

    /// Read simulated card and keypad events from standard input.
    #[arg(long)]
    stdin_keypad: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(message) => {
            tracing::error!("{message}");
            std::process::exit(1);
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let conn = open_db(&args.db_path).expect("Could not open the database");

    let receipt_sink: Arc<dyn ReceiptSink> = match &args.printer_device {
        Some(device) => {
            tracing::info!("Printing receipts on {device}");
            Arc::new(DevicePrinter::new(device))
        }
        None => {
            tracing::info!("No printer device given, receipts will be logged");
            Arc::new(LogPrinter)
        }
    };

    let event_buffer = config.event_buffer;
    let state =
        AppState::new(conn, config, receipt_sink).expect("Could not initialize the app state");

    let (event_sender, event_receiver) = mpsc::channel(event_buffer);
    tokio::spawn(run_event_dispatcher(
        event_receiver,
        state.key_broadcaster.clone(),
        state.card_session.clone(),
    ));

    let shutdown = Arc::new(AtomicBool::new(false));
    if args.stdin_keypad {
        tracing::info!("Reading card and keypad events from standard input");
        spawn_event_poller(
            StdinConsole::stdin(),
            event_sender,
            shutdown.clone(),
            POLL_INTERVAL,
        );
    } else {
        drop(event_sender);
    }

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly");

    shutdown.store(true, Ordering::Relaxed);
}

fn build_config(args: &Args) -> Result<AtmConfig, String> {
    let withdrawal_fee = Money::from_major_units(args.withdrawal_fee)
        .filter(|fee| *fee >= Money::ZERO)
        .ok_or_else(|| format!("Invalid withdrawal fee {}", args.withdrawal_fee))?;
    let default_balance = Money::from_major_units(args.default_balance)
        .filter(|balance| *balance >= Money::ZERO)
        .ok_or_else(|| format!("Invalid default balance {}", args.default_balance))?;

    Ok(AtmConfig {
        withdrawal_fee,
        default_balance,
        history_limit: args.history_limit,
        allow_card_provisioning: args.allow_card_provisioning,
        receipt_timeout: Duration::from_millis(args.receipt_timeout_ms),
        ..AtmConfig::default()
    })
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file))
        .with_filter(filter::LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are handled.
        .on_failure(());

    router.layer(tracing_layer)
}
