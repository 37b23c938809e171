//! Purpose: Explicit knobs for a wait, passed in at call time.
//! Exports: `WaitConfig`, `DetectorChoice`.
//! Role: Replaces ambient verbosity/policy state; loadable from JSON.
//! Invariants: `0 < min_delay <= max_delay` once validated.
//! Invariants: Unset fields fall back to the 1/1024 s floor, 60 s cap, auto detection, progress on.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::core::backoff::{Backoff, MAX_DELAY, MIN_DELAY};
use crate::core::detect::{Detector, DetectorKind};
use crate::core::error::{Error, ErrorKind, io_error_kind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorChoice {
    #[default]
    Auto,
    ExclusiveOpen,
    Fuser,
    ProcFd,
    None,
}

impl DetectorChoice {
    pub fn build(self) -> Detector {
        match self {
            DetectorChoice::Auto => Detector::probe(),
            DetectorChoice::ExclusiveOpen => Detector::for_kind(DetectorKind::ExclusiveOpen),
            DetectorChoice::Fuser => Detector::for_kind(DetectorKind::Fuser),
            DetectorChoice::ProcFd => Detector::for_kind(DetectorKind::ProcFd),
            DetectorChoice::None => Detector::for_kind(DetectorKind::None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitConfig {
    #[serde(rename = "min_delay_secs", deserialize_with = "secs_f64")]
    pub min_delay: Duration,
    #[serde(rename = "max_delay_secs", deserialize_with = "secs_f64")]
    pub max_delay: Duration,
    pub detector: DetectorChoice,
    pub progress: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            min_delay: MIN_DELAY,
            max_delay: MAX_DELAY,
            detector: DetectorChoice::Auto,
            progress: true,
        }
    }
}

fn secs_f64<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

impl WaitConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message("failed to read config file")
                .with_path(path)
                .with_source(err)
        })?;
        let config: WaitConfig = serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid config file")
                .with_path(path)
                .with_hint("Expected a JSON object with min_delay_secs, max_delay_secs, detector, progress.")
                .with_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_delay.is_zero() {
            return Err(Error::new(ErrorKind::Usage).with_message("min_delay_secs must be positive"));
        }
        if self.min_delay > self.max_delay {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("min_delay_secs exceeds max_delay_secs"));
        }
        Ok(())
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff::new(self.min_delay, self.max_delay)
    }
}
