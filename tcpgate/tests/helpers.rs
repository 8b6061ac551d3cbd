//! Shared fixtures: a fake procfs tree and in-memory process tables
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use tcpgate::{FilterError, ProcessEntry, ProcessTable, Result};
use tempfile::TempDir;

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// procfs lookalike rooted in a temporary directory
pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        // Non-process entries that a real /proc also has.
        fs::create_dir(dir.path().join("sys"))?;
        fs::write(dir.path().join("uptime"), "1.00 1.00\n")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Start a process: `<root>/<pid>/comm` with the kernel's trailing newline
    pub fn spawn(&self, pid: u32, name: &str) -> io::Result<()> {
        self.spawn_raw(pid, name.as_bytes())
    }

    /// Like [`spawn`](Self::spawn) with the comm bytes exactly as the kernel
    /// would write them, already cut at 15 bytes
    pub fn spawn_raw(&self, pid: u32, comm: &[u8]) -> io::Result<()> {
        let dir = self.dir.path().join(pid.to_string());
        fs::create_dir_all(&dir)?;
        let mut contents = comm.to_vec();
        contents.push(b'\n');
        fs::write(dir.join("comm"), contents)
    }

    /// Process directory without a readable name, like one exiting mid-scan
    pub fn spawn_without_comm(&self, pid: u32) -> io::Result<()> {
        fs::create_dir_all(self.dir.path().join(pid.to_string()))
    }

    pub fn exit(&self, pid: u32) -> io::Result<()> {
        fs::remove_dir_all(self.dir.path().join(pid.to_string()))
    }
}

/// Process table kept in memory
#[derive(Debug, Default)]
pub struct MemoryTable {
    pub entries: BTreeMap<u32, ProcessEntry>,
    /// Every successful mutation in order, `+pid` for insert and `-pid` for remove
    pub log: Vec<i64>,
}

impl MemoryTable {
    pub fn contains(&self, pid: u32) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn pid_set(&self) -> BTreeSet<u32> {
        self.entries.keys().copied().collect()
    }
}

impl ProcessTable for MemoryTable {
    fn pids(&self) -> Result<BTreeSet<u32>> {
        Ok(self.pid_set())
    }

    fn insert(&mut self, pid: u32, entry: ProcessEntry) -> Result<()> {
        self.entries.insert(pid, entry);
        self.log.push(i64::from(pid));
        Ok(())
    }

    fn remove(&mut self, pid: u32) -> Result<()> {
        self.entries.remove(&pid);
        self.log.push(-i64::from(pid));
        Ok(())
    }
}

/// Table whose inserts fail for the pids in `reject`
#[derive(Debug, Default)]
pub struct FlakyTable {
    pub inner: MemoryTable,
    pub reject: BTreeSet<u32>,
}

impl ProcessTable for FlakyTable {
    fn pids(&self) -> Result<BTreeSet<u32>> {
        self.inner.pids()
    }

    fn insert(&mut self, pid: u32, entry: ProcessEntry) -> Result<()> {
        if self.reject.contains(&pid) {
            return Err(FilterError::Io(io::Error::other("map is full")));
        }
        self.inner.insert(pid, entry)
    }

    fn remove(&mut self, pid: u32) -> Result<()> {
        self.inner.remove(pid)
    }
}
