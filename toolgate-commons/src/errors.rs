use std::borrow::Cow;

use anyhow::{Error, Result};

// Protected-file / policy errors
pub const ERR_PROTECTED_FILE: &str = "refusing to modify a protected file";
pub const ERR_OPERATION_DENIED: &str = "operation denied by policy";
pub const ERR_RATE_LIMITED: &str = "tool is rate limited after repeated denials";
pub const ERR_NON_INTERACTIVE_GATE: &str = "approval required but no interactive channel is available";

// Path identity / TOCTOU errors
pub const ERR_PATH_CHANGED: &str = "path identity changed since approval";
pub const ERR_SYMLINK_REJECTED: &str = "refusing to follow a symlink at an approved path";
pub const ERR_FILE_EXISTS: &str = "file already exists";
pub const ERR_STAT_FAILED: &str = "failed to stat path";
pub const ERR_OPEN_FAILED: &str = "failed to open path";

// Channel/IPC errors
pub const ERR_CHANNEL_WRITE: &str = "failed to write approval channel message";
pub const ERR_CHANNEL_READ: &str = "failed to read approval channel message";
pub const ERR_CHANNEL_DECODE: &str = "failed to decode approval channel message";

/// Helper macro for file operation errors with context.
/// Usage: `file_err!("path", read)` -> "failed to read path"
#[macro_export]
macro_rules! file_err {
    ($path:expr, read) => {
        format!("failed to read {}", $path)
    };
    ($path:expr, write) => {
        format!("failed to write {}", $path)
    };
    ($path:expr, open) => {
        format!("failed to open {}", $path)
    };
    ($path:expr, stat) => {
        format!("failed to stat {}", $path)
    };
}

/// Helper macro for context errors.
/// Usage: `ctx_err!(operation, context)` -> "operation context"
#[macro_export]
macro_rules! ctx_err {
    ($op:expr, $ctx:expr) => {
        format!("{}: {}", $op, $ctx)
    };
}

/// Formats an error into a user-facing description, independent of whatever
/// presentation layer the host binary uses.
pub trait ErrorFormatter: Send + Sync {
    fn format_error(&self, error: &Error) -> Cow<'_, str>;
}

/// Reports non-fatal errors to an observability backend.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, error: &Error) -> Result<()>;

    fn capture_message(&self, message: impl Into<Cow<'static, str>>) -> Result<()> {
        let message: Cow<'static, str> = message.into();
        self.capture(&Error::msg(message))
    }
}

/// Drops every event. Useful for tests or hosts that don't wire up
/// observability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    fn capture(&self, _error: &Error) -> Result<()> {
        Ok(())
    }
}

/// Default formatter that surfaces the error's display output.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayErrorFormatter;

impl ErrorFormatter for DisplayErrorFormatter {
    fn format_error(&self, error: &Error) -> Cow<'_, str> {
        Cow::Owned(format!("{error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatter_uses_display() {
        let formatter = DisplayErrorFormatter;
        let error = Error::msg("test error");
        assert_eq!(formatter.format_error(&error), "test error");
    }

    #[test]
    fn noop_reporter_drops_errors() {
        let reporter = NoopErrorReporter;
        let error = Error::msg("test");
        assert!(reporter.capture(&error).is_ok());
        assert!(reporter.capture_message("message").is_ok());
    }

    #[test]
    fn file_err_formats_by_verb() {
        let path = "/tmp/x";
        assert_eq!(file_err!(path, read), "failed to read /tmp/x");
        assert_eq!(file_err!(path, write), "failed to write /tmp/x");
    }
}
