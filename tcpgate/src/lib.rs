// eBPF/XDP is Linux-only. This crate does not compile for other targets.
#![cfg(target_os = "linux")]
// Unsafe is required in a few narrow, documented sites:
//   - bpf.rs: libc::geteuid / libc::setrlimit (RLIMIT_MEMLOCK)
//   - interface.rs: libc::if_nametoindex
//   - process_filter.rs: AF_PACKET socket creation and bind
// All other unsafe is denied.
#![deny(unsafe_code)]

pub mod bpf;
pub mod config;
pub mod error;
pub mod interface;
pub mod port_filter;
pub mod process;
pub mod process_filter;
pub mod reconcile;
pub mod table;
pub mod telemetry;

pub use config::{load_from_path, PortFilterConfig, ProcessFilterConfig, XdpMode};
pub use error::{FilterError, Result};
pub use port_filter::PortFilter;
pub use process::{LiveProcess, ProcFs, ProcessSource};
pub use process_filter::ProcessFilter;
pub use reconcile::{CycleReport, Reconciler};
pub use table::ProcessTable;
pub use tcpgate_common::{ProcessEntry, Verdict};
