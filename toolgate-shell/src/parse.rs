use crate::dangerous;
use crate::dialect::ShellDialect;
use crate::{posix, powershell, windows_cmd};

/// A shell command tokenized per dialect, with safety flags computed.
///
/// Only [`ParsedShellCommand::is_safe_for_matching`] commands may ever be
/// checked against an allowlist entry: a chain, pipe, redirect, subshell,
/// or dangerous token always wins over a matching prefix.
#[derive(Debug, Clone)]
pub struct ParsedShellCommand {
    pub dialect: ShellDialect,
    pub tokens: Vec<String>,
    pub has_chain: bool,
    pub has_pipe: bool,
    pub has_redirect: bool,
    pub has_subshell: bool,
    pub is_dangerous: bool,
    pub balanced_quotes: bool,
}

impl ParsedShellCommand {
    pub fn is_safe_for_matching(&self) -> bool {
        self.balanced_quotes
            && !self.has_chain
            && !self.has_pipe
            && !self.has_redirect
            && !self.has_subshell
            && !self.is_dangerous
    }
}

/// Tokenizes `command` per `dialect` and computes every safety flag.
pub fn parse(dialect: ShellDialect, command: &str) -> ParsedShellCommand {
    let dialect = if dialect == ShellDialect::Unknown {
        crate::detect_dialect()
    } else {
        dialect
    };

    let (tokens, has_chain, has_pipe, has_redirect, has_subshell, balanced_quotes) = match dialect
    {
        ShellDialect::Posix | ShellDialect::Unknown => {
            let r = posix::tokenize(command);
            (
                r.tokens,
                r.has_chain,
                r.has_pipe,
                r.has_redirect,
                r.has_subshell,
                r.balanced_quotes,
            )
        }
        ShellDialect::Cmd => {
            let r = windows_cmd::tokenize(command);
            (
                r.tokens,
                r.has_chain,
                r.has_pipe,
                r.has_redirect,
                r.has_subshell,
                r.balanced_quotes,
            )
        }
        ShellDialect::PowerShell => {
            let r = powershell::tokenize(command);
            (
                r.tokens,
                r.has_chain,
                r.has_pipe,
                r.has_redirect,
                r.has_subshell,
                r.balanced_quotes,
            )
        }
    };

    let is_dangerous = dangerous::is_dangerous(dialect, &tokens);

    tracing::debug!(
        dialect = dialect.as_str(),
        has_chain,
        has_pipe,
        has_redirect,
        has_subshell,
        is_dangerous,
        "parsed shell command"
    );

    ParsedShellCommand {
        dialect,
        tokens,
        has_chain,
        has_pipe,
        has_redirect,
        has_subshell,
        is_dangerous,
        balanced_quotes,
    }
}
