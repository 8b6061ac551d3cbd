//! Types and packet logic shared between the kernel programs and the userspace loader.
//!
//! This crate is `no_std` so it can be compiled for both targets:
//! - `bpfel-unknown-none` (the XDP and socket-filter programs in `tcpgate-ebpf`)
//! - the host target (userspace loader in `tcpgate`, and the tests)
//!
//! The header parser and the classifiers live here so the exact decision logic
//! that runs in the kernel can be exercised on the host against plain byte slices.
//!
//! Enable the `aya-pod` feature in the userspace crate to get the
//! `aya::Pod` impl required for writing [`ProcessEntry`] into BPF maps.
#![no_std]

pub mod parse;
pub mod verdict;

pub use parse::{parse_eth_tcp, parse_ipv4_tcp, Ipv4Header, Packet, ParseError, TcpHeader};
pub use verdict::{classify_identity, classify_port, total_drops, DropCounter, Verdict};

/// Port blocked by the port filter and allowed by the process filter when nothing else is configured.
pub const DEFAULT_PORT: u16 = 4040;

/// Capacity of a process name record, NUL terminator included (kernel `TASK_COMM_LEN`).
pub const COMM_LEN: usize = 16;

/// Maximum number of pids the process table can track at once.
pub const MAX_TRACKED_PIDS: u32 = 1024;

/// Program, map and global names. Both sides import these so they cannot drift.
pub mod names {
    pub const PORT_PROGRAM: &str = "tcpgate_port";
    pub const PROC_PROGRAM: &str = "tcpgate_proc";
    pub const BLOCKED_PORT: &str = "BLOCKED_PORT";
    pub const DROPS: &str = "DROPS";
    pub const TRACKED_PIDS: &str = "TRACKED_PIDS";
    pub const TARGET_PORT: &str = "TARGET_PORT";
}

/// Value stored in the `TRACKED_PIDS` map for every pid whose name matches the target.
///
/// ```text
/// offset 0: name  [u8; 16]  (truncated to 15 bytes, zero padded)
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: [u8; COMM_LEN],
}

impl ProcessEntry {
    /// Builds a record from a process name, keeping at most `COMM_LEN - 1` bytes
    /// so the record always ends in at least one NUL, the same way the kernel
    /// truncates `comm`.
    pub fn new(name: &[u8]) -> Self {
        let mut buf = [0u8; COMM_LEN];
        let len = name.len().min(COMM_LEN - 1);
        buf[..len].copy_from_slice(&name[..len]);
        Self { name: buf }
    }

    /// Name bytes up to the first NUL.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(COMM_LEN);
        &self.name[..end]
    }

    /// True when `name`, truncated the same way, equals this record's name.
    pub fn matches(&self, name: &[u8]) -> bool {
        *self == Self::new(name)
    }
}

impl Default for ProcessEntry {
    fn default() -> Self {
        Self { name: [0u8; COMM_LEN] }
    }
}

const _: () = {
    assert!(core::mem::size_of::<ProcessEntry>() == COMM_LEN);
};

/// Implement `aya::Pod` so the userspace loader can write `ProcessEntry` into BPF maps.
/// Only compiled when the `aya-pod` feature is enabled (i.e. in the userspace crate).
///
/// SAFETY: `ProcessEntry` is `#[repr(C)]`, `Copy`, a single byte array with no padding.
#[cfg(feature = "aya-pod")]
#[allow(unsafe_code)]
unsafe impl aya::Pod for ProcessEntry {}
