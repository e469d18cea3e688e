//! The key-reading loop.
//!
//! Keys are read one at a time. A bound key runs its binding inside a fresh
//! break scope. Unbound printable keys are buffered and typed into the line
//! in one batch once no further key is immediately available, so pasted
//! text is redrawn once instead of once per character.

use tracing::{debug, trace, warn};

use super::bindings::raw_mode_chord;
use crate::console::KeyPress;
use crate::error::Result;
use crate::raw_mode::RawModeGuard;
use crate::shell::Shell;

/// Runs the loop until exit is requested or the console runs out of input.
pub(crate) async fn run<S: 'static>(shell: &mut Shell<S>, state: &mut S) -> Result<()> {
    let raw_mode = if shell.config.raw_mode {
        RawModeGuard::acquire()
    } else {
        RawModeGuard::inactive()
    };
    let mut typed: Vec<char> = Vec::new();

    while !shell.exit_requested {
        let (key, interrupted) = {
            let scope = shell.break_scope.begin();
            let key = shell.console.read_key(scope.token()).await?;
            (key, scope.token().is_cancelled())
        };

        let Some(key) = key else {
            if interrupted {
                flush_typed(shell, &mut typed)?;
                debug!("Break while waiting for input, discarding line");
                let console = shell.console.as_mut();
                shell.input.set_input(console, "")?;
                continue;
            }
            debug!("Console input exhausted");
            break;
        };
        trace!(key = ?key, "Key pressed");

        if let Some(binding) = shell.bindings.get(&key).cloned() {
            flush_typed(shell, &mut typed)?;
            let scope = shell.break_scope.begin();
            let result = binding.invoke(key, shell, state, scope.token()).await;
            drop(scope);
            report_key_error(shell, key, result)?;
            continue;
        }

        if raw_mode.is_active() {
            if let Some(action) = raw_mode_chord(key) {
                flush_typed(shell, &mut typed)?;
                let scope = shell.break_scope.begin();
                let result = action.perform(shell, state, scope.token()).await;
                drop(scope);
                report_key_error(shell, key, result)?;
                continue;
            }
        }

        match key.character() {
            Some(ch) => typed.push(ch),
            None => trace!(key = ?key, "Ignoring unbound key"),
        }
        if !typed.is_empty() && !shell.console.key_available()? {
            flush_typed(shell, &mut typed)?;
        }
    }

    flush_typed(shell, &mut typed)?;
    drop(raw_mode);
    Ok(())
}

/// Logs a failed key action and shows it on the error stream. Only console
/// failures while reporting propagate.
fn report_key_error<S>(shell: &mut Shell<S>, key: KeyPress, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => {
            debug!(key = ?key, "Key handler cancelled");
            Ok(())
        }
        Err(err) => {
            warn!(key = ?key, error = %err, "Key handler failed");
            shell.console.write_error_line(&format!("Error: {err}"))
        }
    }
}

fn flush_typed<S>(shell: &mut Shell<S>, typed: &mut Vec<char>) -> Result<()> {
    if typed.is_empty() {
        return Ok(());
    }
    let console = shell.console.as_mut();
    shell.input.insert(console, typed)?;
    typed.clear();
    Ok(())
}
