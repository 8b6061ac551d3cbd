//! Live process enumeration from procfs.
//!
//! Every scan lists `<root>/<pid>/` and reads `<root>/<pid>/comm` lazily. A
//! process can exit between the listing and the read; that entry comes back
//! as an `Err` and the consumer skips it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One running process as seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveProcess {
    pub pid: u32,
    /// Raw `comm` bytes. The kernel cuts names at 15 bytes, possibly inside a
    /// UTF-8 sequence, so they are not decoded.
    pub name: Vec<u8>,
}

/// Source of the live process set.
///
/// `scan` starts a fresh enumeration each time it is called. Individual items
/// may fail without ending the enumeration.
pub trait ProcessSource {
    type Iter: Iterator<Item = io::Result<LiveProcess>>;

    fn scan(&self) -> io::Result<Self::Iter>;
}

/// [`ProcessSource`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcessSource for ProcFs {
    type Iter = ProcIter;

    fn scan(&self) -> io::Result<ProcIter> {
        Ok(ProcIter { entries: fs::read_dir(&self.root)? })
    }
}

pub struct ProcIter {
    entries: fs::ReadDir,
}

impl Iterator for ProcIter {
    type Item = io::Result<LiveProcess>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            // Only numeric directory names are processes.
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            return Some(read_comm(&entry.path()).map(|name| LiveProcess { pid, name }));
        }
    }
}

/// Read `<dir>/comm` without its trailing newline.
fn read_comm(dir: &Path) -> io::Result<Vec<u8>> {
    let mut name = fs::read(dir.join("comm"))?;
    if name.last() == Some(&b'\n') {
        name.pop();
    }
    Ok(name)
}
