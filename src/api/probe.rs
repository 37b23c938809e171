//! Purpose: One-shot capability and status query without waiting.
//! Exports: `ProbeReport`, `PathProbe`, `probe_paths`.
//! Role: Lets callers see which mechanism was selected and what it reports right now.
//! Invariants: Never sleeps; every path is checked exactly once.

use std::path::PathBuf;

use crate::core::detect::{Detection, Detector, DetectorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathProbe {
    pub path: PathBuf,
    pub exists: bool,
    pub is_file: bool,
    pub detection: Detection,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeReport {
    pub detector: DetectorKind,
    pub paths: Vec<PathProbe>,
}

pub fn probe_paths<I, P>(detector: &Detector, paths: I) -> ProbeReport
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let paths = paths
        .into_iter()
        .map(Into::into)
        .map(|path: PathBuf| PathProbe {
            exists: path.exists(),
            is_file: path.is_file(),
            detection: detector.detect(&path),
            path,
        })
        .collect();
    ProbeReport {
        detector: detector.kind(),
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::probe_paths;
    use crate::core::detect::{Detection, Detector, DetectorKind, NoMechanism};

    #[test]
    fn reports_each_path_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("out.mif");
        std::fs::write(&file, b"data").expect("write");
        let missing = dir.path().join("missing");
        let detector = Detector::new(Box::new(NoMechanism));

        let report = probe_paths(&detector, [file.clone(), missing.clone(), dir.path().to_path_buf()]);

        assert_eq!(report.detector, DetectorKind::None);
        assert_eq!(report.paths.len(), 3);
        assert!(report.paths[0].exists && report.paths[0].is_file);
        assert!(!report.paths[1].exists);
        assert!(report.paths[2].exists && !report.paths[2].is_file);
        assert!(report.paths.iter().all(|probe| probe.detection == Detection::Unknown));
    }
}
