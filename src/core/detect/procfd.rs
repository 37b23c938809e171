// Linux process-table scan: finds descriptors in /proc/<pid>/fd that refer to
// the same inode and are open for writing according to fdinfo.
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::{Detection, DetectorKind, InUseDetector};

#[derive(Clone, Debug)]
pub struct ProcFdScan {
    proc_root: PathBuf,
}

impl ProcFdScan {
    pub fn locate() -> Option<Self> {
        let proc_root = PathBuf::from("/proc");
        if proc_root.join("self").join("fdinfo").is_dir() {
            Some(Self { proc_root })
        } else {
            None
        }
    }

    fn pid_dirs(&self) -> Option<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.proc_root).ok()?;
        Some(
            entries
                .flatten()
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()))
                })
                .map(|entry| entry.path())
                .collect(),
        )
    }
}

impl InUseDetector for ProcFdScan {
    fn kind(&self) -> DetectorKind {
        DetectorKind::ProcFd
    }

    fn query(&self, path: &Path) -> Detection {
        let target = match fs::metadata(path) {
            Ok(meta) => (meta.dev(), meta.ino()),
            Err(_) => return Detection::Unknown,
        };
        let Some(pid_dirs) = self.pid_dirs() else {
            tracing::debug!(root = %self.proc_root.display(), "process table unreadable");
            return Detection::Unknown;
        };

        for pid_dir in pid_dirs {
            // Other users' processes and exited pids are skipped.
            let Ok(fds) = fs::read_dir(pid_dir.join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                let Ok(meta) = fs::metadata(fd.path()) else {
                    continue;
                };
                if (meta.dev(), meta.ino()) != target {
                    continue;
                }
                let fdinfo = pid_dir.join("fdinfo").join(fd.file_name());
                if fd_opened_for_write(&fdinfo) {
                    tracing::trace!(fd = %fd.path().display(), "writer found");
                    return Detection::Busy;
                }
            }
        }
        Detection::Free
    }
}

fn fd_opened_for_write(fdinfo: &Path) -> bool {
    fs::read_to_string(fdinfo)
        .ok()
        .and_then(|text| parse_fdinfo_flags(&text))
        .is_some_and(|flags| {
            let mode = flags & libc::O_ACCMODE;
            mode == libc::O_WRONLY || mode == libc::O_RDWR
        })
}

/// `flags:` in fdinfo is octal.
fn parse_fdinfo_flags(text: &str) -> Option<i32> {
    text.lines()
        .find_map(|line| line.strip_prefix("flags:"))
        .and_then(|value| i32::from_str_radix(value.trim(), 8).ok())
}
