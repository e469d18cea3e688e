use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("command_shell_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Runs the shell with `input` piped to stdin.
fn run_shell(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_command-shell"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn command-shell");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("failed to write stdin");

    child.wait_with_output().expect("failed to wait for command-shell")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(String::from)
        .collect()
}

#[test]
fn help_flag_describes_options() {
    let output = Command::new(env!("CARGO_BIN_EXE_command-shell"))
        .arg("--help")
        .output()
        .expect("failed to run command-shell");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--history-file"));
    assert!(stdout.contains("--no-raw-mode"));
}

#[test]
fn piped_session_sets_and_echoes_variables() {
    let output = run_shell(&[], "set name world\necho hello $name\nexit\n");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"> set name world".to_string()), "stdout: {lines:?}");
    assert!(lines.contains(&"hello world".to_string()), "stdout: {lines:?}");
    assert!(lines.contains(&"> exit".to_string()));
}

#[test]
fn unknown_command_is_reported_on_stderr() {
    let output = run_shell(&[], "frobnicate\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No matching command found."), "stderr: {stderr}");
}

#[test]
fn malformed_input_prints_usage() {
    let output = run_shell(&[], "set a b c\n");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: set [-d|--delete] [arg] [arg]"), "stderr: {stderr}");
}

#[test]
fn help_lists_builtin_commands() {
    let output = run_shell(&[], "help\n");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["echo", "set", "clear", "history", "help", "exit"] {
        assert!(stdout.contains(name), "missing {name} in: {stdout}");
    }
}

#[test]
fn config_file_sets_prompt() {
    let dir = TempDir::new("config_prompt");
    let config = dir.join("shell.yaml");
    fs::write(&config, "prompt: \"api> \"\n").expect("failed to write config");

    let output = run_shell(&["--config", config.to_str().unwrap()], "echo hi\n");

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"api> echo hi".to_string()), "stdout: {lines:?}");
}

#[test]
fn prompt_flag_overrides_config_file() {
    let dir = TempDir::new("prompt_override");
    let config = dir.join("shell.yaml");
    fs::write(&config, "prompt: \"api> \"\n").expect("failed to write config");

    let output = run_shell(
        &["--config", config.to_str().unwrap(), "--prompt", "$ "],
        "echo hi\n",
    );

    let lines = stdout_lines(&output);
    assert!(lines.contains(&"$ echo hi".to_string()), "stdout: {lines:?}");
}

#[test]
fn history_file_persists_between_runs() {
    let dir = TempDir::new("history_file");
    let history = dir.join("history");
    let history_arg = history.to_str().unwrap();

    run_shell(&["--history-file", history_arg], "echo one\necho two\n");
    let saved = fs::read_to_string(&history).expect("history file written");
    assert_eq!(saved.lines().collect::<Vec<_>>(), vec!["echo one", "echo two"]);

    let output = run_shell(&["--history-file", history_arg], "history\n");
    let lines = stdout_lines(&output);
    assert!(lines.contains(&"   1  echo one".to_string()), "stdout: {lines:?}");
    assert!(lines.contains(&"   2  echo two".to_string()), "stdout: {lines:?}");
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new("missing_config");
    let config = dir.join("absent.yaml");

    let output = run_shell(&["--config", config.to_str().unwrap()], "");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Failed to load config"), "stderr: {stderr}");
}

#[test]
fn log_file_receives_diagnostics() {
    let dir = TempDir::new("log_file");
    let log = dir.join("shell.log");

    let output = Command::new(env!("CARGO_BIN_EXE_command-shell"))
        .args(["--log-file", log.to_str().unwrap()])
        .env("RUST_LOG", "info")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run command-shell");

    assert!(output.status.success());
    let contents = fs::read_to_string(&log).expect("log file written");
    assert!(contents.contains("Shell started"), "log: {contents}");
}
