//! Embedded BPF object and the process-level prerequisites for loading it.

use tracing::debug;

use crate::error::{FilterError, Result};

/// Raw bytes of the compiled `tcpgate-ebpf` object, embedded at compile time.
/// `include_bytes_aligned!` ensures 8-byte alignment required by aya's ELF parser.
static BPF_BYTES: &[u8] =
    aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/tcpgate.bpf.o"));

pub(crate) fn object() -> &'static [u8] {
    BPF_BYTES
}

/// Fails with [`FilterError::NotPrivileged`] unless running as root.
#[allow(unsafe_code)]
pub fn check_privileges() -> Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        return Err(FilterError::NotPrivileged);
    }
    Ok(())
}

/// Lift `RLIMIT_MEMLOCK` so map creation works on kernels that still charge
/// BPF memory against it (< 5.11). Failure is not fatal.
#[allow(unsafe_code)]
pub fn bump_memlock_rlimit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    // SAFETY: `rlim` is a valid, initialized rlimit that outlives the call.
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!(err = %std::io::Error::last_os_error(), "failed to remove memlock limit");
    }
}
