use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use tcpgate_common::DEFAULT_PORT;

/// XDP attach mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum XdpMode {
    /// Generic (skb) mode, works on every driver
    #[default]
    Skb,
    /// Native driver mode
    Driver,
    /// NIC offload
    Hardware,
}

/// Port filter configuration, built from the command line
#[derive(Debug, Clone)]
pub struct PortFilterConfig {
    /// Interface the XDP program is attached to
    /// Example: "eth0"
    pub interface: String,
    /// TCP destination port to drop
    /// Default: 4040
    pub port: u16,
    /// XDP attach mode
    /// Default: skb
    pub mode: XdpMode,
    /// Seconds between two drop counter reports
    /// Default: 2
    pub report_interval_secs: u64,
}

impl PortFilterConfig {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            port: default_port(),
            mode: XdpMode::default(),
            report_interval_secs: default_report_interval(),
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

/// Process filter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProcessFilterConfig {
    /// Interface the socket filter listens on
    /// Default: interface of the default IPv4 route, or "lo"
    #[serde(default)]
    pub interface: Option<String>,
    /// Process name whose traffic is restricted
    /// Only the first 15 bytes are significant, like the kernel's comm
    /// Default: "myprocess"
    #[serde(default = "default_target_name")]
    pub target_name: String,
    /// The only TCP destination port the target process may receive on
    /// Default: 4040
    #[serde(default = "default_port")]
    pub target_port: u16,
    /// Milliseconds between two reconciliation cycles
    /// Default: 2000
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_ms: u64,
    /// procfs mount point
    /// Default: "/proc"
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

impl ProcessFilterConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}

impl Default for ProcessFilterConfig {
    fn default() -> Self {
        Self {
            interface: None,
            target_name: default_target_name(),
            target_port: default_port(),
            reconcile_interval_ms: default_reconcile_interval(),
            proc_root: default_proc_root(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_report_interval() -> u64 {
    2
}

fn default_target_name() -> String {
    "myprocess".to_string()
}

fn default_reconcile_interval() -> u64 {
    2000
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}
