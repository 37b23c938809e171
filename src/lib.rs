//! Purpose: Library crate behind the `filewait` CLI: wait for files to exist and be finalized.
//! Exports: `api` (stable surface), `core` (polling, detection, errors), `notice`.
//! Role: Blocking library call for pipelines that consume files produced by other processes.
//! Invariants: All waiting happens on the caller's thread; no background threads.
//! Invariants: Core modules take explicit configuration instead of ambient state.
pub mod api;
pub mod core;
pub mod notice;
