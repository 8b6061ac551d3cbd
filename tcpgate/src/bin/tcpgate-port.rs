use clap::Parser;
use tcpgate::config::validate_port_filter;
use tcpgate::telemetry::{init_tracing, Shutdown};
use tcpgate::{PortFilter, PortFilterConfig, XdpMode};
use tcpgate_common::DEFAULT_PORT;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drop ingress TCP packets to one port with XDP")]
struct Cli {
    /// Network interface to attach to (e.g. eth0)
    interface: String,

    /// TCP destination port to drop
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// XDP attach mode
    #[arg(long, value_enum, default_value_t = XdpMode::Skb)]
    mode: XdpMode,

    /// Seconds between two drop counter reports
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,

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
            // Usage errors exit with 1; --help and --version exit with 0.
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = init_tracing(&cli.log_level, false) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config = PortFilterConfig {
        interface: cli.interface,
        port: cli.port,
        mode: cli.mode,
        report_interval_secs: cli.interval_secs,
    };

    if let Err(err) = run(config).await {
        error!(%err, "port filter exited with error");
        std::process::exit(1);
    }
}

async fn run(config: PortFilterConfig) -> tcpgate::Result<()> {
    validate_port_filter(&config)?;
    let mut shutdown = Shutdown::install()?;

    let mut filter = PortFilter::load(&config.interface)?;
    filter.configure(config.port)?;
    filter.attach(config.mode)?;

    println!("Blocking TCP port {} on {}", config.port, config.interface);

    let mut ticker = tokio::time::interval(config.report_interval());
    // The first tick completes immediately; the first report comes one interval after attach.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => match filter.drop_count() {
                Ok(count) => println!("Dropped: {count}"),
                Err(err) => warn!(%err, "failed to read drop counter"),
            },
        }
    }

    println!("Detaching...");
    filter.detach()
}
