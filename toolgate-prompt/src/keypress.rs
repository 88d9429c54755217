//! Single-keypress raw-mode reader.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::terminal::TerminalGuard;

/// One keystroke observed by the prompt loop, or a cancellation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptKey {
    Char(char),
    Abort,
}

/// Reads one key while the terminal is in raw mode, restoring it before
/// returning regardless of outcome. With raw mode enabled the terminal
/// driver no longer intercepts Ctrl-C as a signal, so crossterm delivers it
/// as an ordinary key event; that is how cancellation is observed here,
/// entirely as a returned value rather than a signal handler.
pub(crate) fn read_key() -> Result<PromptKey> {
    let mut guard = TerminalGuard::enable("approval")?;
    let key = read_key_raw();
    guard.restore()?;
    key
}

fn read_key_raw() -> Result<PromptKey> {
    loop {
        let event = event::read().context("failed to read terminal event")?;
        let Event::Key(key_event) = event else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            match key_event.code {
                KeyCode::Char('c') | KeyCode::Char('d') => return Ok(PromptKey::Abort),
                _ => continue,
            }
        }
        match key_event.code {
            KeyCode::Char(c) => return Ok(PromptKey::Char(c)),
            KeyCode::Esc => return Ok(PromptKey::Abort),
            _ => continue,
        }
    }
}
