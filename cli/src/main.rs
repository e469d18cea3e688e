use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use command_shell::{MemoryConsole, ShellConfig, TerminalConsole};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod builtins;

use builtins::{SessionState, build_shell};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "command-shell", version)]
#[command(about = "Interactive command shell with completion and history")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Prompt shown before each command.
    #[arg(long)]
    prompt: Option<String>,
    /// Persist command history to this file.
    #[arg(long, value_name = "PATH")]
    history_file: Option<PathBuf>,
    /// Write diagnostic logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Leave the terminal in its current mode.
    #[arg(long)]
    no_raw_mode: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli)?;
    let interactive = io::stdin().is_terminal();
    let _log_guard = init_logging(config.log_file.as_deref(), interactive)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to start runtime: {err}"))?;

    if interactive {
        runtime.block_on(run_interactive(config))
    } else {
        runtime.block_on(run_batch(config))
    }
}

async fn run_interactive(config: ShellConfig) -> Result<(), String> {
    let mut shell = build_shell(TerminalConsole::new(), config, true)
        .map_err(|err| format!("Failed to create shell: {err}"))?;
    let mut state = SessionState::default();
    shell.run(&mut state).await.map_err(|err| err.to_string())
}

/// Runs the lines piped on stdin as if typed, then prints the transcript.
async fn run_batch(mut config: ShellConfig) -> Result<(), String> {
    config.raw_mode = false;
    let console = MemoryConsole::new();
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|err| format!("Failed to read stdin: {err}"))?;
        console.type_line(&line);
    }
    debug!(keys = console.remaining_keys(), "Running piped input");

    let mut shell = build_shell(console.clone(), config, false)
        .map_err(|err| format!("Failed to create shell: {err}"))?;
    let mut state = SessionState::default();
    let result = shell.run(&mut state).await.map_err(|err| err.to_string());

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", console.output().trim_end())
        .map_err(|err| format!("Failed to write output: {err}"))?;
    for line in console.errors() {
        eprintln!("{line}");
    }
    result
}

fn load_config(cli: &Cli) -> Result<ShellConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ShellConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => ShellConfig::default(),
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

fn apply_overrides(config: &mut ShellConfig, cli: &Cli) {
    if let Some(prompt) = &cli.prompt {
        config.prompt = prompt.clone();
    }
    if let Some(path) = &cli.history_file {
        config.history.file = Some(path.clone());
    }
    if let Some(path) = &cli.log_file {
        config.log_file = Some(path.clone());
    }
    if cli.no_raw_mode {
        config.raw_mode = false;
    }
}

/// Installs the global subscriber. Interactive sessions log only to a file.
fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<Option<WorkerGuard>, String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let Some(path) = log_file else {
        if interactive {
            return Ok(None);
        }
        // Ignore failure: a global subscriber is already installed.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| format!("Invalid log file path '{}'", path.display()))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_values() {
        let cli = Cli::try_parse_from([
            "command-shell",
            "--prompt",
            "api> ",
            "--history-file",
            "/tmp/history",
            "--no-raw-mode",
        ])
        .unwrap();

        let mut config = ShellConfig::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(config.prompt, "api> ");
        assert_eq!(config.history.file, Some(PathBuf::from("/tmp/history")));
        assert!(!config.raw_mode);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_interactive_session_without_log_file_installs_no_subscriber() {
        let guard = init_logging(None, true).unwrap();

        assert!(guard.is_none());
        assert!(!tracing::dispatcher::has_been_set());
    }

    #[test]
    fn test_absent_flags_keep_config_values() {
        let cli = Cli::try_parse_from(["command-shell"]).unwrap();
        let mut config = ShellConfig {
            prompt: "$ ".to_string(),
            ..ShellConfig::default()
        };
        apply_overrides(&mut config, &cli);

        assert_eq!(config.prompt, "$ ");
        assert!(config.raw_mode);
    }
}
