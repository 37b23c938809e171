//! Purpose: Decide whether some process still holds a regular file open for writing.
//! Exports: `Detection`, `DetectorKind`, `InUseDetector`, `Detector`, strategy types.
//! Role: Platform-polymorphic predicate feeding the finalization phase.
//! Invariants: Strategy is chosen once per `Detector`; never re-probed per call.
//! Invariants: Missing paths and non-regular files are always `Unknown`.
//! Invariants: OS failures degrade to `Unknown`; detection never errors or panics.

use std::path::Path;

use serde::{Deserialize, Serialize};

mod exclusive;
mod fuser;
#[cfg(target_os = "linux")]
mod procfd;

pub use exclusive::ExclusiveOpen;
pub use fuser::FuserQuery;
#[cfg(target_os = "linux")]
pub use procfd::ProcFdScan;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    Busy,
    Free,
    Unknown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    ExclusiveOpen,
    Fuser,
    ProcFd,
    None,
}

impl DetectorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::ExclusiveOpen => "exclusive-open",
            DetectorKind::Fuser => "fuser",
            DetectorKind::ProcFd => "proc-fd",
            DetectorKind::None => "none",
        }
    }
}

/// One in-use detection mechanism. Callers go through [`Detector::detect`],
/// which guarantees `path` was a regular file just before `query` runs.
pub trait InUseDetector: Send + Sync {
    fn kind(&self) -> DetectorKind;
    fn query(&self, path: &Path) -> Detection;
}

/// Used when the platform offers nothing to ask.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMechanism;

impl InUseDetector for NoMechanism {
    fn kind(&self) -> DetectorKind {
        DetectorKind::None
    }

    fn query(&self, _path: &Path) -> Detection {
        Detection::Unknown
    }
}

pub struct Detector {
    strategy: Box<dyn InUseDetector>,
}

impl Detector {
    pub fn new(strategy: Box<dyn InUseDetector>) -> Self {
        Self { strategy }
    }

    /// Picks the highest-ranked mechanism available on this host:
    /// exclusive open, then `fuser`, then the `/proc` scan, then nothing.
    pub fn probe() -> Self {
        if ExclusiveOpen::available() {
            return Self::selected(Box::new(ExclusiveOpen));
        }
        if let Some(fuser) = FuserQuery::locate() {
            return Self::selected(Box::new(fuser));
        }
        tracing::debug!("fuser not found on PATH");
        if let Some(scan) = proc_scan() {
            return Self::selected(scan);
        }
        tracing::debug!("no in-use detection mechanism available");
        Self::selected(Box::new(NoMechanism))
    }

    /// Forces one mechanism. An unavailable mechanism degrades to `NoMechanism`
    /// so every query reports `Unknown`.
    pub fn for_kind(kind: DetectorKind) -> Self {
        let strategy: Option<Box<dyn InUseDetector>> = match kind {
            DetectorKind::ExclusiveOpen => {
                ExclusiveOpen::available().then(|| Box::new(ExclusiveOpen) as Box<dyn InUseDetector>)
            }
            DetectorKind::Fuser => {
                FuserQuery::locate().map(|fuser| Box::new(fuser) as Box<dyn InUseDetector>)
            }
            DetectorKind::ProcFd => proc_scan(),
            DetectorKind::None => None,
        };
        match strategy {
            Some(strategy) => Self::selected(strategy),
            None => {
                if kind != DetectorKind::None {
                    tracing::debug!(requested = kind.as_str(), "detector unavailable on this host");
                }
                Self::selected(Box::new(NoMechanism))
            }
        }
    }

    fn selected(strategy: Box<dyn InUseDetector>) -> Self {
        tracing::debug!(detector = strategy.kind().as_str(), "selected in-use detector");
        Self::new(strategy)
    }

    pub fn kind(&self) -> DetectorKind {
        self.strategy.kind()
    }

    pub fn detect(&self, path: &Path) -> Detection {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => self.strategy.query(path),
            Ok(_) => Detection::Unknown,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "path vanished before detection");
                Detection::Unknown
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn proc_scan() -> Option<Box<dyn InUseDetector>> {
    ProcFdScan::locate().map(|scan| Box::new(scan) as Box<dyn InUseDetector>)
}

#[cfg(not(target_os = "linux"))]
fn proc_scan() -> Option<Box<dyn InUseDetector>> {
    None
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("kind", &self.kind())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedDetector;
    use super::{Detection, Detector, DetectorKind, NoMechanism};

    #[test]
    fn missing_path_is_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone");
        let scripted = ScriptedDetector::default().script(&path, &[Detection::Busy]);
        let detector = Detector::new(Box::new(scripted.clone()));
        assert_eq!(detector.detect(&path), Detection::Unknown);
        assert_eq!(scripted.calls(), 0);
    }

    #[test]
    fn directory_is_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scripted = ScriptedDetector::default().script(dir.path(), &[Detection::Busy]);
        let detector = Detector::new(Box::new(scripted.clone()));
        assert_eq!(detector.detect(dir.path()), Detection::Unknown);
        assert_eq!(scripted.calls(), 0);
    }

    #[test]
    fn regular_file_is_delegated_to_strategy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.mif");
        std::fs::write(&path, b"data").expect("write");
        let scripted =
            ScriptedDetector::default().script(&path, &[Detection::Busy, Detection::Free]);
        let detector = Detector::new(Box::new(scripted));
        assert_eq!(detector.detect(&path), Detection::Busy);
        assert_eq!(detector.detect(&path), Detection::Free);
        assert_eq!(detector.detect(&path), Detection::Free);
    }

    #[test]
    fn no_mechanism_is_always_unknown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.mif");
        std::fs::write(&path, b"data").expect("write");
        let detector = Detector::new(Box::new(NoMechanism));
        assert_eq!(detector.kind(), DetectorKind::None);
        assert_eq!(detector.detect(&path), Detection::Unknown);
    }

    #[test]
    fn forcing_none_selects_no_mechanism() {
        assert_eq!(Detector::for_kind(DetectorKind::None).kind(), DetectorKind::None);
    }

    #[cfg(not(windows))]
    #[test]
    fn exclusive_open_is_unavailable_off_windows() {
        assert_eq!(
            Detector::for_kind(DetectorKind::ExclusiveOpen).kind(),
            DetectorKind::None
        );
    }

    #[test]
    fn kind_names_match_serde_names() {
        for kind in [
            DetectorKind::ExclusiveOpen,
            DetectorKind::Fuser,
            DetectorKind::ProcFd,
            DetectorKind::None,
        ] {
            let value = serde_json::to_value(kind).expect("serialize");
            assert_eq!(value.as_str(), Some(kind.as_str()));
        }
        let parsed: DetectorKind = serde_json::from_str("\"proc-fd\"").expect("parse");
        assert_eq!(parsed, DetectorKind::ProcFd);
    }
}
