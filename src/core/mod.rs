// Core modules implementing polling, in-use detection, configuration, and error modeling.
pub mod backoff;
pub mod config;
pub mod detect;
pub mod error;
pub mod poll;
pub mod progress;
pub mod wait;
pub mod watch_set;
