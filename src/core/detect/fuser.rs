// Process-file-usage query through `fuser -s`; only the exit status is read.
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Detection, DetectorKind, InUseDetector};

#[derive(Clone, Debug)]
pub struct FuserQuery {
    program: PathBuf,
}

impl FuserQuery {
    pub fn locate() -> Option<Self> {
        which::which("fuser").ok().map(Self::with_program)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl InUseDetector for FuserQuery {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Fuser
    }

    fn query(&self, path: &Path) -> Detection {
        let status = Command::new(&self.program)
            .arg("-s")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => interpret_exit_code(status.code()),
            Err(err) => {
                tracing::debug!(
                    program = %self.program.display(),
                    error = %err,
                    "failed to run fuser"
                );
                Detection::Unknown
            }
        }
    }
}

/// fuser exits 0 when at least one process uses the file. Its fatal errors
/// also exit non-zero, which reads as `Free` and lets the wait finish.
fn interpret_exit_code(code: Option<i32>) -> Detection {
    match code {
        Some(0) => Detection::Busy,
        Some(_) => Detection::Free,
        None => Detection::Unknown,
    }
}
