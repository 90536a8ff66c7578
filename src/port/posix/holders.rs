//! Who else has a device open.
//!
//! On Linux every process's descriptors are visible under `/proc/<pid>/fd` as
//! symlinks to the opened path. Processes whose descriptors we are not
//! allowed to list are skipped.

use std::path::Path;

/// Processes currently holding a path open.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Holders {
    /// This process has at least one descriptor on the path.
    pub ours: bool,
    /// Other processes with a descriptor on the path.
    pub others: Vec<u32>,
}

impl Holders {
    pub fn is_empty(&self) -> bool {
        !self.ours && self.others.is_empty()
    }
}

/// List the processes holding `path` open. `path` should be canonical.
#[cfg(target_os = "linux")]
pub fn holders_of(path: &Path) -> Holders {
    use std::fs;

    let own_pid = std::process::id();
    let mut holders = Holders::default();

    let Ok(procs) = fs::read_dir("/proc") else {
        return holders;
    };

    for entry in procs.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };
        let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        let holds = fds
            .flatten()
            .filter_map(|fd| fs::read_link(fd.path()).ok())
            .any(|target| target == path);
        if !holds {
            continue;
        }
        if pid == own_pid {
            holders.ours = true;
        } else {
            holders.others.push(pid);
        }
    }

    holders
}

/// Without a process table to inspect, rely on `TIOCEXCL` and `flock` alone.
#[cfg(not(target_os = "linux"))]
pub fn holders_of(_path: &Path) -> Holders {
    Holders::default()
}
