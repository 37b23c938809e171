//! Purpose: Define the stable public Rust API boundary for filewait.
//! Exports: Core types and operations needed by callers and the CLI.
//! Role: Public, additive-only surface over the core modules.
//! Invariants: Callers build a `WatchSet` (validated) before any polling starts.
//! Invariants: Detection strategy is selected once per `Waiter`.

mod probe;
mod wait;

pub use crate::core::config::{DetectorChoice, WaitConfig};
pub use crate::core::detect::{
    Detection, Detector, DetectorKind, ExclusiveOpen, FuserQuery, InUseDetector, NoMechanism,
};
#[cfg(target_os = "linux")]
pub use crate::core::detect::ProcFdScan;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::poll::{Sleeper, ThreadSleeper};
pub use crate::core::progress::{NoProgress, ProgressBar, ProgressSink, StderrProgress};
pub use crate::core::wait::{PhaseReport, PhaseStatus, WaitReport, Waiter};
pub use crate::core::watch_set::WatchSet;
pub use probe::{PathProbe, ProbeReport, probe_paths};
pub use wait::{wait_for, wait_for_with};
