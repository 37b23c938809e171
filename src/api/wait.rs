//! Purpose: One-call entry points for waiting on a single path or a batch.
//! Exports: `wait_for`, `wait_for_with`.
//! Role: Normalizes input into a `WatchSet` and runs the full pipeline.
//! Invariants: Input validation fails fast with `ErrorKind::Usage` before any polling.

use std::path::PathBuf;

use crate::core::config::WaitConfig;
use crate::core::error::Error;
use crate::core::wait::{WaitReport, Waiter};
use crate::core::watch_set::WatchSet;

/// Waits with default configuration (auto-detected mechanism, stderr progress).
pub fn wait_for<I, P>(paths: I) -> Result<WaitReport, Error>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    wait_for_with(paths, &WaitConfig::default())
}

pub fn wait_for_with<I, P>(paths: I, config: &WaitConfig) -> Result<WaitReport, Error>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let set = WatchSet::new(paths)?;
    let waiter = Waiter::new(config)?;
    Ok(waiter.wait_for(&set))
}
