// Exclusive-open probe: on Windows an open for write with sharing denied fails
// while any other handle to the file is live.
use std::io;
use std::path::Path;

use super::{Detection, DetectorKind, InUseDetector};

#[cfg(windows)]
const ERROR_SHARING_VIOLATION: i32 = 32;
#[cfg(windows)]
const ERROR_LOCK_VIOLATION: i32 = 33;

#[derive(Clone, Copy, Debug, Default)]
pub struct ExclusiveOpen;

impl ExclusiveOpen {
    pub fn available() -> bool {
        cfg!(windows)
    }
}

impl InUseDetector for ExclusiveOpen {
    fn kind(&self) -> DetectorKind {
        DetectorKind::ExclusiveOpen
    }

    #[cfg(windows)]
    fn query(&self, path: &Path) -> Detection {
        use std::fs::OpenOptions;
        use std::os::windows::fs::OpenOptionsExt;

        match std::fs::metadata(path) {
            Ok(meta) if meta.permissions().readonly() => return Detection::Unknown,
            Ok(_) => {}
            Err(_) => return Detection::Unknown,
        }
        // No create, no truncate; the handle drops at the end of the arm.
        match OpenOptions::new()
            .read(true)
            .write(true)
            .share_mode(0)
            .open(path)
        {
            Ok(_file) => Detection::Free,
            Err(err) => classify_open_error(&err),
        }
    }

    #[cfg(not(windows))]
    fn query(&self, _path: &Path) -> Detection {
        Detection::Unknown
    }
}

#[cfg(windows)]
fn classify_open_error(err: &io::Error) -> Detection {
    match err.raw_os_error() {
        Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION) => Detection::Busy,
        _ => {
            tracing::debug!(error = %err, "exclusive open failed for another reason");
            Detection::Unknown
        }
    }
}

#[cfg(not(windows))]
#[allow(dead_code)]
fn classify_open_error(_err: &io::Error) -> Detection {
    Detection::Unknown
}

#[cfg(test)]
mod tests {
    use super::{ExclusiveOpen, classify_open_error};
    use crate::core::detect::{Detection, InUseDetector};

    #[test]
    fn permission_failure_is_unknown() {
        let err = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(classify_open_error(&err), Detection::Unknown);
    }

    #[cfg(not(windows))]
    #[test]
    fn query_is_unknown_off_windows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.mif");
        std::fs::write(&path, b"data").expect("write");
        assert!(!ExclusiveOpen::available());
        assert_eq!(ExclusiveOpen.query(&path), Detection::Unknown);
    }

    #[cfg(windows)]
    #[test]
    fn open_handle_is_busy_until_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.mif");
        let writer = std::fs::File::create(&path).expect("create");
        assert_eq!(ExclusiveOpen.query(&path), Detection::Busy);
        drop(writer);
        assert_eq!(ExclusiveOpen.query(&path), Detection::Free);
    }

    #[cfg(windows)]
    #[test]
    fn sharing_violation_is_busy() {
        let err = std::io::Error::from_raw_os_error(32);
        assert_eq!(classify_open_error(&err), Detection::Busy);
    }
}
