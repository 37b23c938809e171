//! Purpose: Progress reporting contract plus the stock stderr and no-op sinks.
//! Exports: `ProgressSink`, `ProgressBar`, `StderrProgress`, `NoProgress`.
//! Role: Observability for long waits; never affects control flow.
//! Invariants: A bar is incremented once per newly satisfied item and finished with `done`.
//! Invariants: `total` is `None` when the denominator can shrink between rounds.

use std::io::{self, IsTerminal, Write};

pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str, total: Option<usize>) -> Box<dyn ProgressBar>;
}

pub trait ProgressBar {
    fn increment(&mut self);
    fn done(self: Box<Self>);
}

/// Draws `label: n/total` on stderr when it is a terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn start(&self, label: &str, total: Option<usize>) -> Box<dyn ProgressBar> {
        let bar = StderrBar {
            label: label.to_string(),
            total,
            count: 0,
            enabled: io::stderr().is_terminal(),
        };
        bar.draw();
        Box::new(bar)
    }
}

struct StderrBar {
    label: String,
    total: Option<usize>,
    count: usize,
    enabled: bool,
}

impl StderrBar {
    fn line(&self) -> String {
        match self.total {
            Some(total) => format!("{}: {}/{}", self.label, self.count, total),
            None => format!("{}: {}", self.label, self.count),
        }
    }

    fn draw(&self) {
        if !self.enabled {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.line());
        let _ = stderr.flush();
    }
}

impl ProgressBar for StderrBar {
    fn increment(&mut self) {
        self.count += 1;
        self.draw();
    }

    fn done(self: Box<Self>) {
        if self.enabled {
            let _ = writeln!(io::stderr(), "\r{} [done]", self.line());
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _label: &str, _total: Option<usize>) -> Box<dyn ProgressBar> {
        Box::new(NoBar)
    }
}

struct NoBar;

impl ProgressBar for NoBar {
    fn increment(&mut self) {}

    fn done(self: Box<Self>) {}
}


#[cfg(test)]
mod tests {
    use super::testing::{ProgressEvent, RecordingProgress};
    use super::{NoProgress, ProgressSink, StderrBar};

    #[test]
    fn stderr_line_shows_total_when_known() {
        let mut bar = StderrBar {
            label: "Waiting for creation of 2 new items".to_string(),
            total: Some(2),
            count: 0,
            enabled: false,
        };
        bar.count = 1;
        assert_eq!(bar.line(), "Waiting for creation of 2 new items: 1/2");
        bar.total = None;
        assert_eq!(bar.line(), "Waiting for creation of 2 new items: 1");
    }

    #[test]
    fn recording_sink_captures_lifecycle() {
        let sink = RecordingProgress::default();
        let mut bar = sink.start("label", None);
        bar.increment();
        bar.done();
        assert_eq!(
            sink.events(),
            vec![
                ProgressEvent::Start {
                    label: "label".to_string(),
                    total: None
                },
                ProgressEvent::Increment,
                ProgressEvent::Done,
            ]
        );
    }

    #[test]
    fn no_progress_accepts_calls() {
        let mut bar = NoProgress.start("ignored", Some(3));
        bar.increment();
        bar.done();
    }
}
