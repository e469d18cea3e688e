//! Crossterm-backed console for a real terminal.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::{cursor, style, terminal, QueueableCommand};
use tracing::trace;

use super::{Console, KeyPress};
use crate::cancel::CancelToken;
use crate::error::Result;

/// Delay between polls for terminal input while waiting for a key.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Console writing to stdout and reading keys from the terminal.
#[derive(Debug)]
pub struct TerminalConsole {
    out: io::Stdout,
    pending: VecDeque<KeyPress>,
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConsole {
    /// Creates a console on the process's stdout.
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            pending: VecDeque::new(),
        }
    }

    /// Reads one terminal event, queueing it if it is a key press.
    fn read_event(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.pending.push_back(KeyPress::new(key.code, key.modifiers));
            }
            Event::Paste(text) => {
                self.pending.extend(text.chars().map(KeyPress::from));
            }
            other => trace!(event = ?other, "Ignoring terminal event"),
        }
        Ok(())
    }

    fn drain_ready_events(&mut self) -> io::Result<()> {
        while self.pending.is_empty() && event::poll(Duration::ZERO)? {
            self.read_event()?;
        }
        Ok(())
    }

    /// Moves the caret using absolute positioning so the move wraps across
    /// rows. Falls back to a relative move when the terminal cannot report
    /// its geometry.
    fn move_wrapped(&mut self, delta: isize) -> io::Result<()> {
        match (terminal::size(), cursor::position()) {
            (Ok((columns, _)), Ok((column, row))) if columns > 0 => {
                let width = columns as isize;
                let linear = (row as isize * width + column as isize + delta).max(0);
                let target_row = u16::try_from(linear / width).unwrap_or(u16::MAX);
                let target_column = u16::try_from(linear % width).unwrap_or(0);
                self.out.queue(cursor::MoveTo(target_column, target_row))?;
            }
            _ => {
                let distance = u16::try_from(delta.unsigned_abs()).unwrap_or(u16::MAX);
                if delta < 0 {
                    self.out.queue(cursor::MoveLeft(distance))?;
                } else {
                    self.out.queue(cursor::MoveRight(distance))?;
                }
            }
        }
        self.out.flush()
    }
}

#[async_trait(?Send)]
impl Console for TerminalConsole {
    fn write(&mut self, text: &str) -> Result<()> {
        self.out.queue(style::Print(text.replace('\n', "\r\n")))?;
        self.out.flush()?;
        Ok(())
    }

    fn write_error_line(&mut self, text: &str) -> Result<()> {
        let mut err = io::stderr();
        err.queue(style::Print(text))?;
        err.queue(style::Print("\r\n"))?;
        err.flush()?;
        Ok(())
    }

    fn move_caret(&mut self, delta: isize) -> Result<()> {
        if delta != 0 {
            self.move_wrapped(delta)?;
        }
        Ok(())
    }

    fn set_caret_visible(&mut self, visible: bool) -> Result<()> {
        if visible {
            self.out.queue(cursor::Show)?;
        } else {
            self.out.queue(cursor::Hide)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.out.queue(terminal::Clear(terminal::ClearType::All))?;
        self.out.queue(cursor::MoveTo(0, 0))?;
        self.out.flush()?;
        Ok(())
    }

    fn key_available(&mut self) -> Result<bool> {
        self.drain_ready_events()?;
        Ok(!self.pending.is_empty())
    }

    async fn read_key(&mut self, cancel: &CancelToken) -> Result<Option<KeyPress>> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                return Ok(Some(key));
            }
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if event::poll(Duration::ZERO)? {
                self.read_event()?;
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}
