use aya::maps::MapError;
use aya::programs::ProgramError;
use thiserror::Error;

/// Errors raised while loading, configuring, attaching or feeding the filters.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to load BPF object: {0}")]
    Load(#[from] aya::EbpfError),

    #[error("program '{0}' not found in BPF object")]
    ProgramNotFound(&'static str),

    #[error("BPF program has an unexpected type: {0}")]
    ProgramType(#[source] ProgramError),

    #[error("failed to load program into kernel: {0}")]
    ProgramLoad(#[source] ProgramError),

    #[error("failed to attach program: {0}")]
    Attach(#[source] ProgramError),

    #[error("failed to detach program: {0}")]
    Detach(#[source] ProgramError),

    #[error("map '{0}' not found in BPF object")]
    MapNotFound(&'static str),

    #[error("BPF map operation failed: {0}")]
    Map(#[from] MapError),

    #[error("network interface '{0}' does not exist")]
    InterfaceNotFound(String),

    #[error("loading eBPF programs requires root (CAP_BPF and CAP_NET_ADMIN)")]
    NotPrivileged,

    #[error("the blocked port can only be configured before the filter is attached")]
    AlreadyAttached,

    #[error("failed to open packet socket on '{interface}': {source}")]
    Socket {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
