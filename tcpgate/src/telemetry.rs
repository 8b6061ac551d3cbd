use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Initialize the global `fmt` subscriber.
///
/// `RUST_LOG` overrides `log_level` when set.
pub fn init_tracing(
    log_level: &str,
    show_target: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(show_target);

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))?;

    Ok(())
}

/// SIGINT / SIGTERM listener, installed once before the filters are attached
/// so an early interruption is not lost.
pub struct Shutdown {
    sigterm: Signal,
    sigint: Signal,
}

impl Shutdown {
    pub fn install() -> std::io::Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))?;
        Ok(Self { sigterm, sigint })
    }

    /// Resolves on the first SIGINT or SIGTERM.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = self.sigint.recv() => info!("Received SIGINT, shutting down"),
        }
    }
}
