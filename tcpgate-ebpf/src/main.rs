//! Kernel programs for the two tcpgate filters.
//!
//! - `tcpgate_port` (XDP): drops TCP packets to the port stored in `BLOCKED_PORT`
//!   and counts them in the per-CPU `DROPS` slot.
//! - `tcpgate_proc` (socket filter): drops TCP packets of pids listed in
//!   `TRACKED_PIDS` unless they go to `TARGET_PORT`.
//!
//! All parsing and decisions come from `tcpgate-common`; this file only adapts
//! the kernel contexts and maps to it.
#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    helpers::bpf_get_current_pid_tgid,
    macros::{map, socket_filter, xdp},
    maps::{Array, HashMap, PerCpuArray},
    programs::{SkBuffContext, XdpContext},
};
use tcpgate_common::{
    classify_identity, classify_port, DropCounter, Packet, ProcessEntry, Verdict, DEFAULT_PORT,
    MAX_TRACKED_PIDS,
};

// ── Globals patched at load time by EbpfLoader::set_global ──────────────────

#[no_mangle]
static TARGET_PORT: u16 = DEFAULT_PORT;

// ── BPF maps ─────────────────────────────────────────────────────────────────

/// Slot 0: port blocked by `tcpgate_port`, host byte order. 0 = not configured.
#[map]
static BLOCKED_PORT: Array<u16> = Array::with_max_entries(1, 0);

/// Slot 0: packets dropped by `tcpgate_port`, one copy per CPU. Userspace sums them.
#[map]
static DROPS: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

/// pid (tgid) -> name, maintained by the userspace reconciliation loop.
#[map]
static TRACKED_PIDS: HashMap<u32, ProcessEntry> = HashMap::with_max_entries(MAX_TRACKED_PIDS, 0);

// ── Packet access ────────────────────────────────────────────────────────────

struct XdpPacket<'a>(&'a XdpContext);

impl Packet for XdpPacket<'_> {
    /// Explicit bounds check against `data_end` before the read, the pattern
    /// the verifier accepts for direct packet access.
    #[inline(always)]
    fn read<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let start = self.0.data();
        let end = self.0.data_end();
        let access_end = start.checked_add(offset)?.checked_add(N)?;
        if access_end > end {
            return None;
        }
        let ptr = start.checked_add(offset)? as *const [u8; N];
        Some(unsafe { core::ptr::read_unaligned(ptr) })
    }
}

struct SkbPacket<'a>(&'a SkBuffContext);

impl Packet for SkbPacket<'_> {
    #[inline(always)]
    fn read<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.0.load::<[u8; N]>(offset).ok()
    }
}

/// This CPU's copy of `DROPS[0]`. No other CPU writes it, and an XDP program
/// is not preempted by itself, so a plain add cannot lose a count.
struct DropSlot;

impl DropCounter for DropSlot {
    #[inline(always)]
    fn increment(&self) {
        if let Some(count) = DROPS.get_ptr_mut(0) {
            unsafe { *count += 1 };
        }
    }
}

// ── Entry points ─────────────────────────────────────────────────────────────

#[xdp]
pub fn tcpgate_port(ctx: XdpContext) -> u32 {
    let blocked = BLOCKED_PORT.get(0).copied().filter(|&port| port != 0);
    match classify_port(&XdpPacket(&ctx), blocked, &DropSlot) {
        Verdict::Pass => xdp_action::XDP_PASS,
        Verdict::Drop => xdp_action::XDP_DROP,
    }
}

/// Attached to a cooked (`SOCK_DGRAM`) packet socket, so the IPv4 header
/// starts at offset 0. Returning 0 drops the packet, the length keeps it whole.
#[socket_filter]
pub fn tcpgate_proc(ctx: SkBuffContext) -> i64 {
    let pid = (bpf_get_current_pid_tgid() >> 32) as u32;
    let tracked = unsafe { TRACKED_PIDS.get(&pid) }.is_some();
    let target_port = unsafe { core::ptr::read_volatile(&TARGET_PORT) };

    match classify_identity(&SkbPacket(&ctx), 0, tracked, target_port) {
        Verdict::Pass => i64::from(ctx.len()),
        Verdict::Drop => 0,
    }
}

// ── Required for no_std + no_main ────────────────────────────────────────────

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
