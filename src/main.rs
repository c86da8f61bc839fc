use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use cost_report::{
    AppState, build_app,
    config::ReportConfig,
    observability,
    table::{ConsistencyReport, TableStore, check_file_consistency},
};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "cost-report.toml";

/// CLI arguments for the cost report service
#[derive(Parser, Debug)]
#[command(version, about = "Usage and cost report service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./cost-report.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV path, overriding `dataset.path` from the config
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the report server (default)
    Serve,
    /// Report dataset lines whose field count differs from the header
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref(), args.dataset.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Check => run_check(&config),
    }
}

/// Resolve the config file and apply CLI overrides.
fn load_config(explicit: Option<&Path>, dataset: Option<&Path>) -> Result<ReportConfig, String> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        }
    };

    let mut config = match &path {
        Some(path) => ReportConfig::from_file(path)
            .map_err(|e| format!("Failed to load config from {}: {e}", path.display()))?,
        None => ReportConfig::default(),
    };

    if let Some(dataset) = dataset {
        config.dataset.path = dataset.display().to_string();
    }

    Ok(config)
}

async fn run_server(config: ReportConfig) -> ExitCode {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics");
    }

    tracing::info!(
        dataset = %config.dataset.path,
        max_report_groups = config.limits.max_report_groups,
        "Starting cost report service"
    );

    // The store is complete before the listener binds
    let store = TableStore::open(&config.dataset);
    observability::metrics::set_dataset_rows(store.row_count());
    if !store.is_loaded() {
        tracing::warn!("Serving without a dataset; report requests will return 500");
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = AppState::new(config.clone(), store);
    let app = build_app(&config, state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(address = %addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

fn run_check(config: &ReportConfig) -> ExitCode {
    let path = config.dataset.path_buf();

    let report = match check_file_consistency(&path) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match report {
        ConsistencyReport::Empty => {
            eprintln!("Error: '{}' is empty", path.display());
            ExitCode::FAILURE
        }
        ConsistencyReport::Checked {
            expected_fields,
            records,
            inconsistent,
        } => {
            println!(
                "{}: header has {expected_fields} fields, {records} data lines checked",
                path.display()
            );
            if inconsistent.is_empty() {
                println!("All lines are consistent.");
                return ExitCode::SUCCESS;
            }
            for line in &inconsistent {
                println!(
                    "Line {} has {} fields (expected {expected_fields}): {}",
                    line.line,
                    line.fields.len(),
                    line.fields.join(",")
                );
            }
            println!("{} inconsistent lines found.", inconsistent.len());
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
