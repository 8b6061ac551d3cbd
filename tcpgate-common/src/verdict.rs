//! Pass/drop decisions for the two filters.
//!
//! Both classifiers are fail-open: anything that does not parse as IPv4/TCP,
//! and any missing configuration, resolves to [`Verdict::Pass`].

use crate::parse::{parse_eth_tcp, parse_ipv4_tcp, Packet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Drop,
}

/// Drop counter bumped once per dropped packet.
///
/// In the kernel every CPU increments its own slot and readers add the slots
/// up with [`total_drops`], so no increment is shared between CPUs.
pub trait DropCounter {
    fn increment(&self);
}

/// One CPU's slot.
impl DropCounter for core::cell::Cell<u64> {
    #[inline(always)]
    fn increment(&self) {
        self.set(self.get().wrapping_add(1));
    }
}

#[cfg(target_has_atomic = "64")]
impl DropCounter for core::sync::atomic::AtomicU64 {
    #[inline(always)]
    fn increment(&self) {
        self.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
    }
}

/// Sum of the per-CPU drop slots.
pub fn total_drops<I: IntoIterator<Item = u64>>(per_cpu: I) -> u64 {
    per_cpu.into_iter().fold(0, u64::wrapping_add)
}

/// Port filter decision for an Ethernet frame.
///
/// `blocked_port` is `None` when the configuration slot could not be read.
/// Ports are compared in host byte order on both sides.
#[inline(always)]
pub fn classify_port<P, C>(pkt: &P, blocked_port: Option<u16>, drops: &C) -> Verdict
where
    P: Packet + ?Sized,
    C: DropCounter + ?Sized,
{
    let Some(blocked) = blocked_port else {
        return Verdict::Pass;
    };
    match parse_eth_tcp(pkt) {
        Ok(tcp) if tcp.dst_port == blocked => {
            drops.increment();
            Verdict::Drop
        }
        _ => Verdict::Pass,
    }
}

/// Process filter decision for a packet whose IPv4 header starts at `offset`.
///
/// `tracked` is the result of the pid lookup in the process table. Untracked
/// pids always pass; tracked pids only pass traffic to `target_port`.
#[inline(always)]
pub fn classify_identity<P>(pkt: &P, offset: usize, tracked: bool, target_port: u16) -> Verdict
where
    P: Packet + ?Sized,
{
    if !tracked {
        return Verdict::Pass;
    }
    match parse_ipv4_tcp(pkt, offset) {
        Ok(tcp) if tcp.dst_port != target_port => Verdict::Drop,
        _ => Verdict::Pass,
    }
}
