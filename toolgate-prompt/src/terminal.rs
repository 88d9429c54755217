//! RAII raw-mode guard for the approval prompt.
//!
//! Mirrors the host's `TerminalModeGuard`: raw mode is entered explicitly
//! and restored on every exit path, including `Drop`, so a prompt that
//! returns early (or panics) never leaves the terminal in raw mode.

use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

pub(crate) struct TerminalGuard {
    label: &'static str,
    raw_mode_enabled: bool,
}

impl TerminalGuard {
    pub(crate) fn enable(label: &'static str) -> Result<Self> {
        enable_raw_mode().with_context(|| format!("failed to enable raw mode for {label} prompt"))?;
        Ok(Self { label, raw_mode_enabled: true })
    }

    pub(crate) fn restore(&mut self) -> Result<()> {
        if self.raw_mode_enabled {
            disable_raw_mode()
                .with_context(|| format!("failed to disable raw mode after {} prompt", self.label))?;
            self.raw_mode_enabled = false;
        }
        io::stderr().flush().ok();
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
            self.raw_mode_enabled = false;
        }
        let _ = io::stderr().flush();
    }
}
