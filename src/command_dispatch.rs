//! Purpose: Hold top-level CLI command dispatch for `filewait`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `wait` prints exactly one report on success; notices never touch stdout.

use super::*;
use filewait::api::{PhaseStatus, WaitReport, Waiter, WatchSet, probe_paths};
use report_json::{probe_report_json, wait_report_json};

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Wait(args) => {
            let set = WatchSet::new(args.paths.iter().cloned())?;
            let config = wait_config(&args)?;
            let waiter = Waiter::new(&config)?;
            let report = waiter.wait_for(&set);

            if report.finalization.status == PhaseStatus::Undeterminable {
                if let Some(notice) = finalization_notice(report.detector.as_str(), set.paths()) {
                    emit_notice(&notice, color_mode);
                }
            }
            if args.json || !io::stdout().is_terminal() {
                emit_json(wait_report_json(&set, &report));
            } else {
                emit_wait_human(&set, &report);
            }
            Ok(RunOutcome::ok())
        }
        Command::Probe { paths, detector } => {
            let choice: DetectorChoice = detector.map(Into::into).unwrap_or_default();
            let detector = choice.build();
            let report = probe_paths(&detector, paths);
            emit_json(probe_report_json(&report));
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "filewait", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_wait_human(set: &WatchSet, report: &WaitReport) {
    let finalization = match report.finalization.status {
        PhaseStatus::Immediate => "already finalized".to_string(),
        PhaseStatus::Waited => format!("finalized after {:.3}s", report.finalization.slept.as_secs_f64()),
        PhaseStatus::NoFiles => "directories only".to_string(),
        PhaseStatus::Undeterminable => format!(
            "not verified ({} detector could not tell)",
            report.detector.as_str()
        ),
    };
    let existence = match report.existence.status {
        PhaseStatus::Waited => format!("appeared after {:.3}s", report.existence.slept.as_secs_f64()),
        _ => "already present".to_string(),
    };
    let noun = if set.len() == 1 { "path" } else { "paths" };
    println!("ready: {} {noun}; {existence}; {finalization}", set.len());
}
