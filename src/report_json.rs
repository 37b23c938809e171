//! Purpose: Shared JSON serializers for wait and probe reports.
//! Exports: `wait_report_json` and `probe_report_json`.
//! Role: Keep report envelope shape consistent across CLI commands.
//! Invariants: Stable key names; durations are emitted in milliseconds.

use filewait::api::{PhaseReport, ProbeReport, WaitReport, WatchSet};
use serde_json::{Map, Value, json};

pub(crate) fn phase_json(phase: &PhaseReport) -> Value {
    json!({
        "status": phase.status,
        "sleeps": phase.sleeps,
        "slept_ms": phase.slept.as_micros() as f64 / 1000.0,
    })
}

pub(crate) fn wait_report_json(set: &WatchSet, report: &WaitReport) -> Value {
    let mut map = Map::new();
    map.insert(
        "paths".to_string(),
        json!(set.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()),
    );
    map.insert("detector".to_string(), json!(report.detector));
    map.insert("existence".to_string(), phase_json(&report.existence));
    map.insert("finalization".to_string(), phase_json(&report.finalization));
    Value::Object(map)
}

pub(crate) fn probe_report_json(report: &ProbeReport) -> Value {
    let paths = report
        .paths
        .iter()
        .map(|probe| {
            json!({
                "path": probe.path.display().to_string(),
                "exists": probe.exists,
                "is_file": probe.is_file,
                "detection": probe.detection,
            })
        })
        .collect::<Vec<_>>();
    json!({
        "detector": report.detector,
        "paths": paths,
    })
}
