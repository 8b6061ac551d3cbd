//! Packet path scenarios run on the host against the same classifiers the
//! kernel programs use.

mod helpers;

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use helpers::{FakeProc, MemoryTable, TestResult};
use tcpgate::{ProcFs, Reconciler, Verdict};
use tcpgate_common::{classify_identity, classify_port, total_drops, DEFAULT_PORT};

/// IPv4 + TCP header, no options, no payload
fn ipv4_tcp(dst_port: u16) -> Vec<u8> {
    let mut pkt = vec![0x45, 0, 0, 40, 0x12, 0x34, 0x40, 0, 64, 6, 0, 0];
    pkt.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
    pkt.extend_from_slice(&51000u16.to_be_bytes());
    pkt.extend_from_slice(&dst_port.to_be_bytes());
    pkt.extend_from_slice(&[0; 8]);
    pkt.extend_from_slice(&[0x50, 0x02, 0xff, 0xff, 0, 0, 0, 0]);
    pkt
}

fn ethernet(payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![0xff; 6];
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
    frame.extend_from_slice(&0x0800u16.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[test]
fn port_filter_drops_blocked_port_and_counts() {
    // One drop slot per CPU, read back as their sum.
    let cpus = [Cell::new(0u64), Cell::new(0u64)];
    let blocked = Some(DEFAULT_PORT);
    let count = || total_drops(cpus.iter().map(Cell::get));

    let verdict = classify_port(&ethernet(&ipv4_tcp(4040))[..], blocked, &cpus[0]);
    assert_eq!(verdict, Verdict::Drop);
    assert_eq!(count(), 1);

    let verdict = classify_port(&ethernet(&ipv4_tcp(80))[..], blocked, &cpus[1]);
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(count(), 1);

    let verdict = classify_port(&ethernet(&ipv4_tcp(4040))[..], blocked, &cpus[1]);
    assert_eq!(verdict, Verdict::Drop);
    assert_eq!(count(), 2);
}

#[test]
fn port_filter_passes_everything_when_unconfigured() {
    let drops = AtomicU64::new(0);
    let verdict = classify_port(&ethernet(&ipv4_tcp(4040))[..], None, &drops);
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(drops.load(Ordering::Relaxed), 0);
}

#[test]
fn identity_filter_follows_the_process_table() -> TestResult {
    let proc = FakeProc::new()?;
    proc.spawn(100, "myprocess")?;
    proc.spawn(200, "curl")?;
    let source = ProcFs::new(proc.root());
    let reconciler = Reconciler::new("myprocess");
    let mut table = MemoryTable::default();
    reconciler.reconcile(&source, &mut table)?;

    let allowed = ipv4_tcp(DEFAULT_PORT);
    let other = ipv4_tcp(22);

    // Tracked process: only the target port passes.
    assert_eq!(classify_identity(&allowed[..], 0, table.contains(100), DEFAULT_PORT), Verdict::Pass);
    assert_eq!(classify_identity(&other[..], 0, table.contains(100), DEFAULT_PORT), Verdict::Drop);

    // Unrelated process: everything passes.
    assert_eq!(classify_identity(&other[..], 0, table.contains(200), DEFAULT_PORT), Verdict::Pass);

    // Once the process exits and the table converges, its pid is free again.
    proc.exit(100)?;
    reconciler.reconcile(&source, &mut table)?;
    assert_eq!(classify_identity(&other[..], 0, table.contains(100), DEFAULT_PORT), Verdict::Pass);

    // Same traffic from a process started afterwards that is not the target.
    proc.spawn(300, "wget")?;
    reconciler.reconcile(&source, &mut table)?;
    assert!(!table.contains(300));
    assert_eq!(classify_identity(&other[..], 0, table.contains(300), DEFAULT_PORT), Verdict::Pass);
    Ok(())
}

#[test]
fn identity_filter_fails_open_on_garbage() {
    let garbage = [0x60, 0, 0, 0];
    assert_eq!(classify_identity(&garbage[..], 0, true, DEFAULT_PORT), Verdict::Pass);
}
