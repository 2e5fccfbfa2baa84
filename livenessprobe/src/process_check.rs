use crate::error::{self, Result};
use log::trace;
use snafu::ResultExt;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PROC_ROOT: &str = "/proc";
const DELETED_SUFFIX: &str = " (deleted)";
// TASK_COMM_LEN less the trailing NUL
const COMM_LEN: usize = 15;

/// One row of a process table snapshot.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ProcessEntry {
    pub(crate) pid: u32,
    /// Base name of the executable.
    pub(crate) name: String,
    /// Full path of the loaded executable, when it could be read.
    pub(crate) path: Option<PathBuf>,
}

/// Identifies the process a target looks for.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ProcessSpec {
    /// Matches any process whose executable base name is this, ignoring case. A process known only
    /// by its `comm` name matches on the first 15 bytes, since the kernel keeps no more.
    Name(String),
    /// Matches only a process loaded from exactly this path, ignoring case.
    Path(PathBuf),
}

impl ProcessSpec {
    pub(crate) fn matches(&self, entry: &ProcessEntry) -> bool {
        match self {
            ProcessSpec::Name(name) => {
                if entry.path.is_none() && name.len() > COMM_LEN {
                    entry
                        .name
                        .as_bytes()
                        .eq_ignore_ascii_case(&name.as_bytes()[..COMM_LEN])
                } else {
                    entry.name.eq_ignore_ascii_case(name)
                }
            }
            ProcessSpec::Path(path) => {
                let base_name = path.file_name().map(OsStr::to_string_lossy);
                let same_name = match base_name {
                    Some(base_name) => entry.name.eq_ignore_ascii_case(&base_name),
                    None => false,
                };
                same_name
                    && entry.path.as_ref().map_or(false, |entry_path| {
                        entry_path
                            .to_string_lossy()
                            .eq_ignore_ascii_case(&path.to_string_lossy())
                    })
            }
        }
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessSpec::Name(name) => f.write_str(name),
            ProcessSpec::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub(crate) trait ProcessLister {
    /// Takes a snapshot of the running processes.
    fn snapshot(&self) -> Result<Vec<ProcessEntry>>;

    /// Whether a running process matches `spec`.
    fn is_running(&self, spec: &ProcessSpec) -> Result<bool> {
        Ok(self.snapshot()?.iter().any(|entry| spec.matches(entry)))
    }
}

/// Lists processes by walking a procfs mount.
pub(crate) struct ProcfsLister {
    root: PathBuf,
}

impl ProcfsLister {
    pub(crate) fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    pub(crate) fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ProcessLister for ProcfsLister {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        let dir = fs::read_dir(&self.root).context(error::ProcessTable { path: &self.root })?;
        let mut entries = Vec::new();
        for dirent in dir {
            let dirent = dirent.context(error::ProcessTable { path: &self.root })?;
            let pid = match dirent.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) {
                Some(pid) => pid,
                None => continue,
            };
            // processes can exit while we walk the table
            if let Some(entry) = read_entry(&dirent.path(), pid) {
                trace!("pid {}: {} {:?}", entry.pid, entry.name, entry.path);
                entries.push(entry);
            }
        }
        trace!("found {} processes under {}", entries.len(), self.root.display());
        Ok(entries)
    }
}

fn read_entry(dir: &Path, pid: u32) -> Option<ProcessEntry> {
    let path = fs::read_link(dir.join("exe")).ok().map(strip_deleted);
    let name = match path.as_ref().and_then(|p| p.file_name()) {
        Some(name) => name.to_string_lossy().into_owned(),
        None => read_comm(dir).ok()?,
    };
    Some(ProcessEntry { pid, name, path })
}

fn read_comm(dir: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(dir.join("comm"))?.trim_end().to_string())
}

/// The kernel appends a marker to the link target when the executable was replaced on disk.
fn strip_deleted(path: PathBuf) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(DELETED_SUFFIX)) {
        Some(stripped) => PathBuf::from(stripped),
        None => path,
    }
}
