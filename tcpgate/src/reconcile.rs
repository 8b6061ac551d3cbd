//! Keeps the process table in line with the live process set.
//!
//! One cycle:
//! 1. scan live processes (entries that vanish mid-scan are skipped),
//! 2. keep the pids whose name matches the target,
//! 3. insert the matching pids the table does not have yet,
//! 4. remove the pids the table has but that no longer match.
//!
//! Insertions always run before removals. A mutation that fails for one pid
//! is logged and retried on the next cycle; the table then lags reality by at
//! most one interval.

use std::collections::BTreeSet;
use std::time::Duration;

use tcpgate_common::ProcessEntry;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::process::ProcessSource;
use crate::table::ProcessTable;

/// Outcome of a single reconciliation cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Live pids matching the target.
    pub discovered: usize,
    pub inserted: usize,
    pub removed: usize,
    /// Table mutations that failed and will be retried.
    pub failed: usize,
    /// Processes whose name could not be read.
    pub skipped: usize,
}

impl CycleReport {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.removed > 0
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    target: ProcessEntry,
}

impl Reconciler {
    pub fn new(target_name: &str) -> Self {
        Self { target: ProcessEntry::new(target_name.as_bytes()) }
    }

    /// Pids of live processes whose name matches the target, and the number
    /// of processes that could not be read.
    pub fn discover<S: ProcessSource>(&self, source: &S) -> Result<(BTreeSet<u32>, usize)> {
        let mut discovered = BTreeSet::new();
        let mut skipped = 0;
        for process in source.scan()? {
            match process {
                Ok(process) if self.target.matches(&process.name) => {
                    discovered.insert(process.pid);
                }
                Ok(_) => {}
                Err(err) => {
                    debug!(%err, "skipping unreadable process");
                    skipped += 1;
                }
            }
        }
        Ok((discovered, skipped))
    }

    /// Run one cycle against `table`.
    ///
    /// Fails only when the process set or the table keys cannot be listed at
    /// all; per-pid failures are counted in the report.
    pub fn reconcile<S, T>(&self, source: &S, table: &mut T) -> Result<CycleReport>
    where
        S: ProcessSource,
        T: ProcessTable + ?Sized,
    {
        let (discovered, skipped) = self.discover(source)?;
        let present = table.pids()?;

        let mut report = CycleReport { discovered: discovered.len(), skipped, ..Default::default() };

        for &pid in discovered.difference(&present) {
            match table.insert(pid, self.target) {
                Ok(()) => {
                    debug!(pid, "tracking process");
                    report.inserted += 1;
                }
                Err(err) => {
                    warn!(pid, %err, "failed to add pid to process table");
                    report.failed += 1;
                }
            }
        }

        for &pid in present.difference(&discovered) {
            match table.remove(pid) {
                Ok(()) => {
                    debug!(pid, "untracking process");
                    report.removed += 1;
                }
                Err(err) => {
                    warn!(pid, %err, "failed to remove pid from process table");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Reconcile immediately, then every `period`, until `cancel` fires.
    ///
    /// Cancellation is only observed between cycles.
    pub async fn run<S, T>(
        &self,
        source: &S,
        table: &mut T,
        period: Duration,
        cancel: CancellationToken,
    ) where
        S: ProcessSource,
        T: ProcessTable + ?Sized,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // The procfs walk and the map syscalls block; keep them off the
            // other tasks' worker when the runtime has more than one.
            let outcome = match Handle::current().runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    tokio::task::block_in_place(|| self.reconcile(source, table))
                }
                _ => self.reconcile(source, table),
            };

            match outcome {
                Ok(report) if report.changed() || report.failed > 0 => info!(
                    discovered = report.discovered,
                    inserted = report.inserted,
                    removed = report.removed,
                    failed = report.failed,
                    skipped = report.skipped,
                    "process table reconciled"
                ),
                Ok(report) => debug!(
                    discovered = report.discovered,
                    skipped = report.skipped,
                    "process table unchanged"
                ),
                Err(err) => warn!(%err, "reconciliation cycle failed, retrying next interval"),
            }
        }

        debug!("reconciliation loop stopped");
    }
}
