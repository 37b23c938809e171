//! Purpose: Existence and finalization phases plus the `wait_for` pipeline.
//! Exports: `Waiter`, `WaitReport`, `PhaseReport`, `PhaseStatus`.
//! Role: Blocks the caller until every path exists and no regular file is held for writing.
//! Invariants: Existence completes before finalization starts; one linear pipeline.
//! Invariants: Finalization is abandoned when a round yields no determinable result.
//! Invariants: Paths that already satisfy a phase never start a progress bar or sleep.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::core::backoff::Backoff;
use crate::core::config::WaitConfig;
use crate::core::detect::{Detection, Detector, DetectorKind};
use crate::core::error::Error;
use crate::core::poll::{PollOutcome, Sleeper, ThreadSleeper, Tick, poll_until_settled};
use crate::core::progress::{NoProgress, ProgressSink, StderrProgress};
use crate::core::watch_set::WatchSet;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Satisfied on the first, zero-sleep check.
    Immediate,
    /// Satisfied after one or more sleeps.
    Waited,
    /// Finalization only: nothing but directories to check.
    NoFiles,
    /// Finalization only: the detector could not judge any file.
    Undeterminable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PhaseReport {
    pub status: PhaseStatus,
    pub sleeps: u32,
    pub slept: Duration,
}

impl PhaseReport {
    fn immediate() -> Self {
        Self::without_sleep(PhaseStatus::Immediate)
    }

    fn without_sleep(status: PhaseStatus) -> Self {
        Self {
            status,
            sleeps: 0,
            slept: Duration::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitReport {
    pub detector: DetectorKind,
    pub existence: PhaseReport,
    pub finalization: PhaseReport,
}

impl WaitReport {
    pub fn total_sleeps(&self) -> u32 {
        self.existence.sleeps + self.finalization.sleeps
    }
}

/// Holds the detector chosen once at construction plus the knobs for every wait.
pub struct Waiter {
    detector: Detector,
    backoff: Backoff,
    progress: Arc<dyn ProgressSink>,
    sleeper: Arc<dyn Sleeper>,
}

impl Waiter {
    pub fn new(config: &WaitConfig) -> Result<Self, Error> {
        config.validate()?;
        let progress: Arc<dyn ProgressSink> = if config.progress {
            Arc::new(StderrProgress)
        } else {
            Arc::new(NoProgress)
        };
        Ok(Self {
            detector: config.detector.build(),
            backoff: config.backoff(),
            progress,
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn wait_for(&self, paths: &WatchSet) -> WaitReport {
        tracing::debug!(paths = ?paths.paths(), "waiting for paths");
        let existence = self.wait_for_existence(paths);
        let finalization = self.wait_for_finalization(paths);
        WaitReport {
            detector: self.detector.kind(),
            existence,
            finalization,
        }
    }

    pub fn wait_for_existence(&self, paths: &WatchSet) -> PhaseReport {
        let total = paths.len();
        let existing = paths.count_existing();
        if existing == total {
            tracing::debug!("{} existed immediately", plural(total, "item"));
            return PhaseReport::immediate();
        }

        let label = format!("Waiting for creation of {}", paths.describe("new item"));
        let mut bar = self.progress.start(&label, Some(total));
        for _ in 0..existing {
            bar.increment();
        }
        let mut backoff = self.backoff;
        let (_, stats) = poll_until_settled(
            total - existing,
            &mut backoff,
            self.sleeper.as_ref(),
            bar.as_mut(),
            || Tick::Outstanding(total - paths.count_existing()),
        );
        bar.done();
        tracing::debug!(sleeps = stats.sleeps, slept = ?stats.slept, "all paths exist");

        PhaseReport {
            status: PhaseStatus::Waited,
            sleeps: stats.sleeps,
            slept: stats.slept,
        }
    }

    pub fn wait_for_finalization(&self, paths: &WatchSet) -> PhaseReport {
        let files = paths.regular_files();
        if files.is_empty() {
            tracing::debug!("no target files, directories only; not testing for finalization");
            return PhaseReport::without_sleep(PhaseStatus::NoFiles);
        }

        let Some(busy) = self.count_busy(&files) else {
            tracing::debug!(
                detector = self.detector.kind().as_str(),
                "unable to test for finalization of new files"
            );
            return PhaseReport::without_sleep(PhaseStatus::Undeterminable);
        };
        if busy == 0 {
            tracing::debug!("{} immediately ready", plural(files.len(), "file"));
            return PhaseReport::immediate();
        }

        let label = format!(
            "Waiting for finalization of {}",
            describe_files(&files)
        );
        let mut bar = self.progress.start(&label, None);
        for _ in busy..files.len() {
            bar.increment();
        }
        let mut backoff = self.backoff;
        let (outcome, stats) = poll_until_settled(
            busy,
            &mut backoff,
            self.sleeper.as_ref(),
            bar.as_mut(),
            || match self.count_busy(&files) {
                Some(busy) => Tick::Outstanding(busy),
                None => Tick::Indeterminate,
            },
        );
        bar.done();

        let status = match outcome {
            PollOutcome::Settled => {
                tracing::debug!(sleeps = stats.sleeps, slept = ?stats.slept, "all files finalized");
                PhaseStatus::Waited
            }
            PollOutcome::Abandoned => {
                tracing::debug!("in-use status became undeterminable; abandoning finalization");
                PhaseStatus::Undeterminable
            }
        };
        PhaseReport {
            status,
            sleeps: stats.sleeps,
            slept: stats.slept,
        }
    }

    /// Busy count across determinable files, or `None` when every file is `Unknown`.
    fn count_busy(&self, files: &[&Path]) -> Option<usize> {
        let mut busy = 0;
        let mut valid = 0;
        for path in files {
            match self.detector.detect(path) {
                Detection::Busy => {
                    busy += 1;
                    valid += 1;
                }
                Detection::Free => valid += 1,
                Detection::Unknown => {}
            }
        }
        (valid > 0).then_some(busy)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn describe_files(files: &[&Path]) -> String {
    match files {
        [only] => format!("new file \"{}\"", only.display()),
        many => format!("{} new files", many.len()),
    }
}
