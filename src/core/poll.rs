//! Purpose: Shared adaptive-backoff polling loop for both wait phases.
//! Exports: `Sleeper`, `ThreadSleeper`, `Tick`, `PollOutcome`, `PollStats`, `poll_until_settled`.
//! Role: Runs tick -> compare -> sleep on the caller's thread until nothing is outstanding.
//! Invariants: The first tick is taken by the caller before any sleep.
//! Invariants: Delay resets to the floor on a tick with fewer outstanding items, else doubles.
//! Invariants: Progress is reported against a low-water mark so the bar never exceeds its total.

use std::time::Duration;

use crate::core::backoff::Backoff;
use crate::core::progress::ProgressBar;

/// The only suspension point of a wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Result of one poll round.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Tick {
    Outstanding(usize),
    Indeterminate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PollOutcome {
    Settled,
    Abandoned,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct PollStats {
    pub(crate) sleeps: u32,
    pub(crate) slept: Duration,
}

/// Polls `tick` until it reports nothing outstanding, starting from the
/// `initial` count observed by the caller's zero-sleep tick.
pub(crate) fn poll_until_settled<F>(
    initial: usize,
    backoff: &mut Backoff,
    sleeper: &dyn Sleeper,
    bar: &mut dyn ProgressBar,
    mut tick: F,
) -> (PollOutcome, PollStats)
where
    F: FnMut() -> Tick,
{
    let mut stats = PollStats::default();
    let mut previous = initial;
    let mut low_water = initial;

    backoff.reset();
    while previous > 0 {
        let delay = backoff.current();
        sleeper.sleep(delay);
        stats.sleeps += 1;
        stats.slept += delay;

        let outstanding = match tick() {
            Tick::Outstanding(count) => count,
            Tick::Indeterminate => return (PollOutcome::Abandoned, stats),
        };

        if outstanding < low_water {
            for _ in outstanding..low_water {
                bar.increment();
            }
            low_water = outstanding;
        }

        if outstanding < previous {
            backoff.reset();
        } else {
            backoff.grow();
        }
        tracing::trace!(outstanding, next_delay = ?backoff.current(), "poll tick");
        previous = outstanding;
    }

    (PollOutcome::Settled, stats)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sleeper;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records each delay and runs an optional hook with the 1-based sleep index.
    pub(crate) struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
        hook: Box<dyn Fn(usize) + Send + Sync>,
    }

    impl RecordingSleeper {
        pub(crate) fn new() -> Self {
            Self::with_hook(|_| {})
        }

        pub(crate) fn with_hook(hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
            Self {
                delays: Mutex::new(Vec::new()),
                hook: Box::new(hook),
            }
        }

        pub(crate) fn delays(&self) -> Vec<Duration> {
            self.delays.lock().expect("lock").clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) {
            let index = {
                let mut delays = self.delays.lock().expect("lock");
                delays.push(delay);
                delays.len()
            };
            (self.hook)(index);
        }
    }
}
