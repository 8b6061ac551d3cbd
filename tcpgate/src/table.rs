use std::borrow::{Borrow, BorrowMut};
use std::collections::BTreeSet;

use aya::maps::{HashMap, MapData};
use tcpgate_common::ProcessEntry;

use crate::error::Result;

/// pid -> [`ProcessEntry`] table read by the process filter.
///
/// Each operation touches a single key; there is no multi-key transaction.
pub trait ProcessTable {
    /// Pids currently present.
    fn pids(&self) -> Result<BTreeSet<u32>>;

    fn insert(&mut self, pid: u32, entry: ProcessEntry) -> Result<()>;

    fn remove(&mut self, pid: u32) -> Result<()>;
}

/// The `TRACKED_PIDS` BPF hash map. The kernel guarantees per-key atomic
/// updates, so a concurrent lookup sees either the old or the new value.
impl<T> ProcessTable for HashMap<T, u32, ProcessEntry>
where
    T: Borrow<MapData> + BorrowMut<MapData>,
{
    fn pids(&self) -> Result<BTreeSet<u32>> {
        Ok(self.keys().collect::<std::result::Result<BTreeSet<u32>, _>>()?)
    }

    fn insert(&mut self, pid: u32, entry: ProcessEntry) -> Result<()> {
        HashMap::insert(self, pid, entry, 0)?;
        Ok(())
    }

    fn remove(&mut self, pid: u32) -> Result<()> {
        HashMap::remove(self, &pid)?;
        Ok(())
    }
}
