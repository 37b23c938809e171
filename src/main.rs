//! Purpose: `filewait` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, installs tracing, runs commands, emits JSON on stdout.
//! Invariants: Reports go to stdout (JSON unless stdout is a terminal and `--json` is absent).
//! Invariants: Errors and notices go to stderr, as JSON when stderr is not a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{
    Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod report_json;

use filewait::api::{DetectorChoice, Error, ErrorKind, WaitConfig, to_exit_code};
use filewait::notice::{Notice, notice_json, notice_time_now};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(clap_error_hint(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing(cli.verbose);
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, color_mode)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "filewait",
    version,
    about = "Wait until files exist and no process is still writing them",
    long_about = None,
    after_help = r#"EXAMPLES
  $ filewait wait /tmp/out.mif                # block until written and closed
  $ filewait wait a.nii b.nii results/ --json
  $ filewait probe /tmp/out.mif               # which mechanism, and what it sees now

Detection mechanisms, best first: exclusive-open (Windows), fuser, proc-fd (Linux).
When none can judge a file, the wait returns once every path exists."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        global = true,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        help = "Log phase changes to stderr (-v debug, -vv trace); RUST_LOG applies otherwise"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DetectorCli {
    Auto,
    ExclusiveOpen,
    Fuser,
    ProcFd,
    None,
}

impl From<DetectorCli> for DetectorChoice {
    fn from(value: DetectorCli) -> Self {
        match value {
            DetectorCli::Auto => DetectorChoice::Auto,
            DetectorCli::ExclusiveOpen => DetectorChoice::ExclusiveOpen,
            DetectorCli::Fuser => DetectorChoice::Fuser,
            DetectorCli::ProcFd => DetectorChoice::ProcFd,
            DetectorCli::None => DetectorChoice::None,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Block until every path exists and no regular file is open for writing",
        after_help = r#"NOTES
  - Directories only need to exist; regular files must also be finalized.
  - Polling starts at 1/1024 s and doubles while nothing changes, up to 60 s.
  - There is no timeout; wrap with `timeout(1)` if you need one."#
    )]
    Wait(WaitArgs),
    #[command(about = "Show the selected detection mechanism and what it reports for each path")]
    Probe {
        #[arg(value_hint = ValueHint::AnyPath, help = "Paths to check once")]
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, help = "Detection mechanism (default: auto)")]
        detector: Option<DetectorCli>,
    },
    #[command(about = "Print version info")]
    Version,
    #[command(
        about = "Generate shell completion scripts",
        after_help = r#"EXAMPLES
  $ filewait completion bash > ~/.local/share/bash-completion/completions/filewait
  $ filewait completion zsh > ~/.zfunc/_filewait
  $ filewait completion fish > ~/.config/fish/completions/filewait.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct WaitArgs {
    #[arg(value_hint = ValueHint::AnyPath, help = "Files or directories to wait for")]
    paths: Vec<PathBuf>,
    #[arg(long, value_enum, help = "Detection mechanism (default: auto)")]
    detector: Option<DetectorCli>,
    #[arg(long, value_name = "SECS", help = "Initial poll delay in seconds")]
    min_delay: Option<f64>,
    #[arg(long, value_name = "SECS", help = "Upper bound on the poll delay in seconds")]
    max_delay: Option<f64>,
    #[arg(long, help = "Do not draw progress on stderr")]
    no_progress: bool,
    #[arg(long, help = "Emit the JSON report even on a terminal")]
    json: bool,
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "JSON config file (min_delay_secs, max_delay_secs, detector, progress)"
    )]
    config: Option<PathBuf>,
}

fn init_tracing(verbose: u8) {
    let env_filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("filewait=debug"),
        _ => EnvFilter::new("filewait=trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn wait_config(args: &WaitArgs) -> Result<WaitConfig, Error> {
    let mut config = match &args.config {
        Some(path) => WaitConfig::from_json_file(path)?,
        None => WaitConfig::default(),
    };
    if let Some(detector) = args.detector {
        config.detector = detector.into();
    }
    if let Some(secs) = args.min_delay {
        config.min_delay = parse_delay("--min-delay", secs)?;
    }
    if let Some(secs) = args.max_delay {
        config.max_delay = parse_delay("--max-delay", secs)?;
    }
    if args.no_progress {
        config.progress = false;
    }
    config.validate()?;
    Ok(config)
}

fn parse_delay(flag: &str, secs: f64) -> Result<Duration, Error> {
    Duration::try_from_secs_f64(secs).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{flag} must be a non-negative number of seconds"))
            .with_source(err)
    })
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check file permissions on the config or target paths.")
        }
        ErrorKind::NotFound => err.with_hint("Check that the config file path is correct."),
        ErrorKind::Io => err.with_hint("I/O error. Check the path and filesystem."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("filewait {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "filewait",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {}", notice.message);
        return;
    }

    let json = serde_json::to_string(&notice_json(notice)).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn finalization_notice(detector: &str, paths: &[PathBuf]) -> Option<Notice> {
    let mut details = Map::new();
    details.insert("detector".to_string(), json!(detector));
    details.insert(
        "paths".to_string(),
        json!(paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()),
    );
    Some(Notice {
        kind: "finalization_undeterminable".to_string(),
        time: notice_time_now()?,
        cmd: "wait".to_string(),
        message: "unable to test for finalization of new files; proceeding once they exist"
            .to_string(),
        details,
    })
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            display_path(path)
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let subcommand = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .and_then(|usage| {
            usage
                .split_whitespace()
                .skip_while(|token| *token != "filewait")
                .nth(1)
                .filter(|token| !token.starts_with(['-', '<', '[']))
                .map(str::to_string)
        });
    match subcommand {
        Some(name) => format!("Try `filewait {name} --help`."),
        None => "Try `filewait --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, DetectorCli, wait_config};
    use clap::Parser;
    use filewait::api::{DetectorChoice, ErrorKind};
    use std::time::Duration;

    fn wait_args(argv: &[&str]) -> super::WaitArgs {
        let cli = Cli::try_parse_from(argv).expect("parse");
        match cli.command {
            Command::Wait(args) => args,
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = wait_args(&[
            "filewait",
            "wait",
            "a",
            "b",
            "--detector",
            "proc-fd",
            "--max-delay",
            "2.5",
            "--no-progress",
        ]);
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.detector, Some(DetectorCli::ProcFd));
        let config = wait_config(&args).expect("config");
        assert_eq!(config.detector, DetectorChoice::ProcFd);
        assert_eq!(config.max_delay, Duration::from_millis(2500));
        assert!(!config.progress);
    }

    #[test]
    fn negative_delay_is_usage_error() {
        let args = wait_args(&["filewait", "wait", "a", "--min-delay=-1"]);
        let err = wait_config(&args).expect_err("negative");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn inverted_delays_are_usage_error() {
        let args = wait_args(&[
            "filewait",
            "wait",
            "a",
            "--min-delay",
            "5",
            "--max-delay",
            "1",
        ]);
        assert_eq!(wait_config(&args).expect_err("inverted").kind(), ErrorKind::Usage);
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["filewait", "wait", "-vv", "a"]).expect("parse");
        assert_eq!(cli.verbose, 2);
    }
}
