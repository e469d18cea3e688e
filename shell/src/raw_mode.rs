//! Terminal raw-mode guard.
//!
//! While the shell reads keys the terminal must deliver each key press
//! immediately and without echo. On Unix this is done with `stty` against
//! the controlling terminal: the current settings are saved with `-g`, the
//! terminal is switched to `-echo -icanon`, and the saved settings are
//! restored when the guard drops. On Windows crossterm's raw mode is used.
//!
//! Every step is best effort. A failure (no controlling terminal, no `stty`,
//! a hung child) is logged at debug level and the shell keeps running in
//! whatever mode the terminal is in.

use tracing::debug;

/// Restores the terminal settings captured by [`RawModeGuard::acquire`]
/// when dropped.
#[derive(Debug)]
pub struct RawModeGuard {
    restore: Option<Restore>,
}

#[derive(Debug)]
enum Restore {
    #[cfg(unix)]
    Stty(String),
    #[cfg(not(unix))]
    Crossterm,
}

impl RawModeGuard {
    /// Switches the terminal to raw mode.
    pub fn acquire() -> Self {
        match enter() {
            Ok(restore) => {
                debug!("Entered raw terminal mode");
                Self {
                    restore: Some(restore),
                }
            }
            Err(err) => {
                debug!(error = %err, "Could not enter raw terminal mode");
                Self::inactive()
            }
        }
    }

    /// A guard that changed nothing and restores nothing.
    pub fn inactive() -> Self {
        Self { restore: None }
    }

    /// Whether raw mode was entered.
    pub fn is_active(&self) -> bool {
        self.restore.is_some()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            match leave(restore) {
                Ok(()) => debug!("Restored terminal mode"),
                Err(err) => debug!(error = %err, "Could not restore terminal mode"),
            }
        }
    }
}

#[cfg(unix)]
fn enter() -> std::io::Result<Restore> {
    let saved = stty::run(&["-g"])?;
    stty::run(stty::RAW_FLAGS)?;
    Ok(Restore::Stty(saved))
}

#[cfg(unix)]
fn leave(restore: Restore) -> std::io::Result<()> {
    let Restore::Stty(saved) = restore;
    stty::run(&[saved.as_str()]).map(|_| ())
}

#[cfg(not(unix))]
fn enter() -> std::io::Result<Restore> {
    crossterm::terminal::enable_raw_mode()?;
    Ok(Restore::Crossterm)
}

#[cfg(not(unix))]
fn leave(_restore: Restore) -> std::io::Result<()> {
    crossterm::terminal::disable_raw_mode()
}

#[cfg(unix)]
mod stty {
    use std::io::{self, Read};
    use std::process::{Command, Stdio};
    use std::time::Duration;

    use tracing::debug;
    use wait_timeout::ChildExt;

    const TTY: &str = "/dev/tty";

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const DEVICE_FLAG: &str = "-F";
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const DEVICE_FLAG: &str = "-f";

    /// Non-canonical, no echo, reads return after a single byte.
    pub(super) const RAW_FLAGS: &[&str] = &["-echo", "-icanon", "min", "1"];

    const STTY_TIMEOUT: Duration = Duration::from_secs(2);

    /// Runs `stty` against the controlling terminal and returns its trimmed
    /// stdout.
    pub(super) fn run(args: &[&str]) -> io::Result<String> {
        let mut child = Command::new("stty")
            .arg(DEVICE_FLAG)
            .arg(TTY)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        match child.wait_timeout(STTY_TIMEOUT)? {
            Some(status) if status.success() => {
                let mut output = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout.read_to_string(&mut output)?;
                }
                Ok(output.trim().to_string())
            }
            Some(status) => Err(io::Error::other(format!("stty {args:?} exited with {status}"))),
            None => {
                debug!(args = ?args, timeout_ms = STTY_TIMEOUT.as_millis() as u64, "stty timed out, killing process");
                let _ = child.kill();
                let _ = child.wait();
                Err(io::Error::new(io::ErrorKind::TimedOut, "stty timed out"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_guard_is_inert() {
        let guard = RawModeGuard::inactive();
        assert!(!guard.is_active());
        drop(guard);
    }
}
