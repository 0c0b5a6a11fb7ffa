pub mod capture;
pub mod config;
pub mod errors;
pub mod log_retention;
pub mod logging;
pub mod prompt_detector;
pub mod runtime;

use capture::tail_window;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use config::{load_config, AppConfig, CliOverrides, OutputFormat};
use errors::PromptWatchError;
use logging::{append_run_log, init_run_log, reset_run_log, JsonlLogger};
use prompt_detector::{find_bottom_border, BorderShape};
use runtime::ProductionRuntime;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

pub const BUSY_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Parser)]
#[command(name = "promptwatch")]
#[command(about = "Report whether captured assistant output shows an idle prompt box")]
pub struct Cli {
    /// Capture file to scan; stdin is read when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Only scan the last N bytes of the capture
    #[arg(long = "tail-bytes")]
    pub tail_bytes: Option<usize>,
    #[arg(long, value_enum)]
    pub format: Option<CliFormat>,
    /// Exit 0 when idle and 2 when busy
    #[arg(long, default_value_t = false)]
    pub exit_code: bool,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// Verdict for one capture. `line_index` counts lines of the whole capture,
/// starting at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub idle: bool,
    pub line_index: Option<usize>,
    pub shape: Option<BorderShape>,
    pub scanned_bytes: usize,
}

impl Report {
    pub fn verdict(&self) -> &'static str {
        if self.idle {
            "idle"
        } else {
            "busy"
        }
    }
}

pub fn run() -> Result<i32, PromptWatchError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| PromptWatchError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<i32, PromptWatchError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(PromptWatchError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        tail_bytes: cli.tail_bytes,
        format: cli.format.map(Into::into),
        exit_code: cli.exit_code,
        log_file: cli.log_file.clone(),
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;
    install_run_log(&cfg);
    append_run_log(
        "info",
        "config.loaded",
        json!({
            "scan_tail_bytes": cfg.detector.scan_tail_bytes,
            "exit_code": cfg.output.exit_code,
        }),
    );

    let (source, capture) = match &cli.input {
        Some(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            let text = runtime.file_system.read_to_string(&path)?;
            (path.display().to_string(), text)
        }
        None => {
            if runtime.terminal.stdin_is_tty() {
                return Err(PromptWatchError::Cli(
                    "no capture to scan: pass --input or pipe output on stdin".to_string(),
                ));
            }
            ("stdin".to_string(), runtime.terminal.read_input()?)
        }
    };
    append_run_log(
        "debug",
        "capture.read",
        json!({ "source": source, "bytes": capture.len() }),
    );

    let report = scan_capture(&capture, cfg.detector.scan_tail_bytes);
    append_run_log(
        "info",
        "detector.verdict",
        json!({ "source": source, "report": report }),
    );

    let line = match cfg.output.format {
        OutputFormat::Text => report.verdict().to_string(),
        OutputFormat::Json => {
            serde_json::to_string(&report).map_err(|e| PromptWatchError::Report(e.to_string()))?
        }
    };
    runtime.terminal.write_line(&line)?;

    if cfg.output.exit_code && !report.idle {
        return Ok(BUSY_EXIT_CODE);
    }
    Ok(0)
}

/// Runs the detector over `capture`, or over its tail window when a limit
/// is set.
pub fn scan_capture(capture: &str, scan_tail_bytes: Option<usize>) -> Report {
    let scanned = match scan_tail_bytes {
        Some(max_bytes) => tail_window(capture, max_bytes),
        None => capture,
    };
    let skipped_lines = capture[..capture.len() - scanned.len()].matches('\n').count();
    let found = find_bottom_border(scanned);
    Report {
        idle: found.is_some(),
        line_index: found.map(|m| m.line_index + skipped_lines),
        shape: found.map(|m| m.shape),
        scanned_bytes: scanned.len(),
    }
}

fn install_run_log(cfg: &AppConfig) {
    let Some(path) = &cfg.logging.path else {
        reset_run_log();
        return;
    };
    let mut logger = JsonlLogger::new(path);
    logger.max_payload_bytes = cfg.logging.max_payload_bytes;
    logger.budget_bytes = cfg.logging.budget_bytes;
    init_run_log(logger);
}

pub fn render_help() -> String {
    Cli::command().render_long_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::{run_with_runtime, scan_capture, Report, BUSY_EXIT_CODE};
    use crate::errors::PromptWatchError;
    use crate::logging::{init_run_log, reset_run_log, sink_test_guard, JsonlLogger};
    use crate::prompt_detector::BorderShape;
    use crate::runtime::{FakeFileSystem, FakeTerminal, ProductionRuntime};
    use std::ffi::OsString;
    use std::path::Path;
    use std::sync::Arc;

    fn runtime_with(fs: FakeFileSystem, terminal: FakeTerminal) -> ProductionRuntime {
        ProductionRuntime {
            file_system: Arc::new(fs),
            terminal: Arc::new(terminal),
        }
    }

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("promptwatch")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn scan_reports_line_in_whole_capture() {
        let capture = "boot\nlog\n╭──╮\n│ > │\n╰──╯\nstatus\n";
        let report = scan_capture(capture, Some(24));
        assert_eq!(
            report,
            Report {
                idle: true,
                line_index: Some(4),
                shape: Some(BorderShape::Complete),
                scanned_bytes: report.scanned_bytes,
            }
        );
        assert!(report.scanned_bytes <= 24);

        let whole = scan_capture(capture, None);
        assert_eq!(whole.line_index, Some(4));
        assert_eq!(whole.scanned_bytes, capture.len());
    }

    #[test]
    fn stdin_capture_reports_idle() {
        let _sink = sink_test_guard();
        let terminal = FakeTerminal::with_input("╭────╮\n│ > hi │\n╰────╯\nstatus");
        let runtime = runtime_with(FakeFileSystem::default(), terminal.clone());

        let code = run_with_runtime(&args(&[]), Path::new("/work"), &runtime).expect("run");
        assert_eq!(code, 0);
        assert_eq!(terminal.written_lines(), vec!["idle".to_string()]);
    }

    #[test]
    fn file_capture_with_exit_code_reports_busy() {
        let _sink = sink_test_guard();
        let fs = FakeFileSystem::with_file("/work/pane.txt", "╭────╮\n│ > hi │\n╰──── \nstatus");
        let terminal = FakeTerminal::new(true);
        let runtime = runtime_with(fs, terminal.clone());

        let code = run_with_runtime(
            &args(&["--input", "pane.txt", "--exit-code"]),
            Path::new("/work"),
            &runtime,
        )
        .expect("run");
        assert_eq!(code, BUSY_EXIT_CODE);
        assert_eq!(terminal.written_lines(), vec!["busy".to_string()]);
    }

    #[test]
    fn json_format_serializes_report() {
        let _sink = sink_test_guard();
        let terminal = FakeTerminal::with_input("working...\n──╯");
        let runtime = runtime_with(FakeFileSystem::default(), terminal.clone());

        run_with_runtime(&args(&["--format", "json"]), Path::new("/"), &runtime).expect("run");
        let lines = terminal.written_lines();
        let value: serde_json::Value = serde_json::from_str(&lines[0]).expect("json");
        assert_eq!(value["idle"], true);
        assert_eq!(value["line_index"], 1);
        assert_eq!(value["shape"], "partial");
    }

    #[test]
    fn interactive_stdin_without_input_is_rejected() {
        let _sink = sink_test_guard();
        let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::new(true));
        let err = run_with_runtime(&args(&[]), Path::new("/"), &runtime).expect_err("no capture");
        assert!(matches!(err, PromptWatchError::Cli(_)));
    }

    #[test]
    fn unknown_flag_is_a_cli_error() {
        let _sink = sink_test_guard();
        let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::new(false));
        let err = run_with_runtime(&args(&["--watch"]), Path::new("/"), &runtime)
            .expect_err("unknown flag");
        assert!(matches!(err, PromptWatchError::Cli(_)));
    }

    #[test]
    fn run_without_log_path_clears_previous_sink() {
        let _sink = sink_test_guard();
        let dir = tempfile::tempdir().expect("tempdir");
        let stale = dir.path().join("stale.jsonl");
        init_run_log(JsonlLogger::new(&stale));

        let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::with_input("──╯"));
        run_with_runtime(&args(&[]), Path::new("/"), &runtime).expect("run");
        assert!(!stale.exists());

        let fresh = dir.path().join("fresh.jsonl");
        let fresh_arg = fresh.display().to_string();
        let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::with_input("──╯"));
        run_with_runtime(&args(&["--log-file", &fresh_arg]), Path::new("/"), &runtime)
            .expect("run with log");
        let logged = std::fs::read_to_string(&fresh).expect("log").lines().count();
        assert_eq!(logged, 3);

        let runtime = runtime_with(FakeFileSystem::default(), FakeTerminal::with_input("busy"));
        run_with_runtime(&args(&[]), Path::new("/"), &runtime).expect("run without log");
        let after = std::fs::read_to_string(&fresh).expect("log").lines().count();
        assert_eq!(after, logged);
        reset_run_log();
    }
}
