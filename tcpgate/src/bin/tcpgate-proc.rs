use std::path::PathBuf;

use clap::Parser;
use tcpgate::config::validate_process_filter;
use tcpgate::interface::default_interface;
use tcpgate::telemetry::{init_tracing, Shutdown};
use tcpgate::{load_from_path, ProcFs, ProcessFilter, ProcessFilterConfig, Reconciler};
use tokio_util::sync::CancellationToken;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Restrict the TCP traffic of one named process to a single port"
)]
struct Cli {
    /// Optional TOML file overriding the interface, target name, port and interval
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = init_tracing(&cli.log_level, false) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config = match &cli.config {
        Some(path) => load_from_path(path),
        None => Ok(ProcessFilterConfig::default()),
    };

    let result = match config {
        Ok(config) => run(config).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        error!(%err, "process filter exited with error");
        std::process::exit(1);
    }
}

async fn run(config: ProcessFilterConfig) -> tcpgate::Result<()> {
    validate_process_filter(&config)?;
    let mut shutdown = Shutdown::install()?;

    let interface = config.interface.clone().unwrap_or_else(default_interface);
    println!("[INFO] Using network interface: {interface}");

    let mut filter = ProcessFilter::attach(&interface, config.target_port)?;

    println!(
        "[INFO] Filtering traffic for process '{}' on port {}...",
        config.target_name, config.target_port
    );
    println!("[INFO] Press Ctrl+C to exit.");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown.recv().await;
        trigger.cancel();
    });

    let reconciler = Reconciler::new(&config.target_name);
    let source = ProcFs::new(&config.proc_root);
    reconciler
        .run(&source, filter.table_mut(), config.reconcile_interval(), cancel)
        .await;

    println!("Detaching...");
    filter.detach()
}
