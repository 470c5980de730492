//! The server binary: parses positional arguments, wires up the storage
//! engine, credential store, notifier, and worker pool, then runs the
//! accept loop.

use clap::Parser;
use ledgerd::bootstrap;
use ledgerd::constants::{DEFAULT_D, DEFAULT_PORT, DEFAULT_S, DEFAULT_THREADS};
use ledgerd::credentials::CredentialStore;
use ledgerd::notify::Notifier;
use ledgerd::server::{listener, Collaborators, WorkerPool};
use ledgerd::storage::StorageEngine;
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;

/// Concurrent in-process time-series server for sales events.
#[derive(Parser, Debug)]
#[command(name = "ledgerd")]
struct Cli {
    /// TCP port to listen on.
    #[arg(default_value_t = DEFAULT_PORT as i64)]
    port: i64,

    /// Loaded-series LRU capacity.
    #[arg(default_value_t = DEFAULT_S as i64)]
    s: i64,

    /// Retention window, in days.
    #[arg(default_value_t = DEFAULT_D)]
    d: i64,

    /// Worker pool size.
    #[arg(default_value_t = DEFAULT_THREADS as i64)]
    threads: i64,

    /// Extra positional arguments are accepted and ignored, with a warning.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    if !cli.extra.is_empty() {
        log::warn!("ignoring {} extra argument(s): {:?}", cli.extra.len(), cli.extra);
    }

    let args = match bootstrap::validate(cli.port, cli.s, cli.d, cli.threads) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let data_dir = std::path::Path::new("data");
    let storage = match StorageEngine::open(data_dir, args.loaded_series_capacity, args.retention_window) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("failed to open storage engine: {e}");
            return ExitCode::FAILURE;
        }
    };
    let credentials = match CredentialStore::open(data_dir) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("failed to open credential store: {e}");
            return ExitCode::FAILURE;
        }
    };
    let notifier = Arc::new(Notifier::new());
    let pool = Arc::new(WorkerPool::new(args.threads));

    let collaborators = Arc::new(Collaborators {
        storage,
        notifier,
        credentials,
        pool,
    });

    let tcp_listener = match TcpListener::bind(("0.0.0.0", args.port)) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to bind port {}: {e}", args.port);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = listener::serve(tcp_listener, collaborators) {
        eprintln!("accept loop terminated: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
