//! Compiled allowlist entries and match-target extraction.

use regex::Regex;

use toolgate_shell::{matches_prefix, parse, ShellDialect};

use crate::category::category_of;
use crate::types::GateCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    Static,
    Session,
}

enum RegexEntry {
    Compiled { tool: String, pattern: Regex, origin: EntryOrigin },
    Invalid,
}

struct ShellEntry {
    tokens: Vec<String>,
    dialect: ShellDialect,
    origin: EntryOrigin,
}

/// Owns compiled regex entries and shell-prefix entries.
#[derive(Default)]
pub struct Allowlist {
    regex_entries: Vec<RegexEntry>,
    shell_entries: Vec<ShellEntry>,
}

impl Allowlist {
    pub fn new() -> Self {
        Self {
            regex_entries: Vec::with_capacity(16),
            shell_entries: Vec::with_capacity(16),
        }
    }

    pub fn add_regex(&mut self, tool: impl Into<String>, pattern: &str, origin: EntryOrigin) {
        match Regex::new(pattern) {
            Ok(compiled) => self.regex_entries.push(RegexEntry::Compiled {
                tool: tool.into(),
                pattern: compiled,
                origin,
            }),
            Err(error) => {
                tracing::warn!(%error, %pattern, "ignoring invalid allowlist regex");
                self.regex_entries.push(RegexEntry::Invalid);
            }
        }
    }

    pub fn add_shell(&mut self, tokens: Vec<String>, dialect: ShellDialect, origin: EntryOrigin) {
        self.shell_entries.push(ShellEntry { tokens, dialect, origin });
    }

    /// Checks a non-shell tool call's extracted match target against the
    /// regex entries registered for `tool`.
    pub fn check_regex(&self, tool: &str, target: &str) -> bool {
        self.regex_entries.iter().any(|entry| match entry {
            RegexEntry::Compiled { tool: entry_tool, pattern, .. } => {
                entry_tool == tool && pattern.is_match(target)
            }
            RegexEntry::Invalid => false,
        })
    }

    /// Checks a shell command's text against the shell-prefix entries.
    /// Never matches a command that is not safe-for-matching, even if a
    /// prefix coincides textually.
    pub fn check_shell(&self, command_text: &str, dialect: ShellDialect) -> bool {
        let parsed = parse(dialect, command_text);
        self.shell_entries
            .iter()
            .any(|entry| matches_prefix(&parsed, &entry.tokens, entry.dialect))
    }

    /// Match-target extraction per tool: shell commands are matched via
    /// `check_shell`; everything else via `check_regex` against the field
    /// the category nominates.
    pub fn matches(&self, tool: &str, category: GateCategory, target: &str) -> bool {
        if category == GateCategory::Shell {
            self.check_shell(target, ShellDialect::Unknown)
        } else {
            self.check_regex(tool, target)
        }
    }

    /// Produces a new allowlist containing only static entries, with every
    /// regex recompiled (compiled state is never shared between instances).
    pub fn clone_static_into(&self, child: &mut Allowlist) {
        for entry in &self.regex_entries {
            if let RegexEntry::Compiled { tool, pattern, origin: EntryOrigin::Static } = entry {
                child.add_regex(tool.clone(), pattern.as_str(), EntryOrigin::Static);
            }
        }
        for entry in &self.shell_entries {
            if entry.origin == EntryOrigin::Static {
                child.add_shell(entry.tokens.clone(), entry.dialect, EntryOrigin::Static);
            }
        }
    }

    pub fn regex_len(&self) -> usize {
        self.regex_entries.len()
    }

    pub fn shell_len(&self) -> usize {
        self.shell_entries.len()
    }
}

/// Extracts the text a tool call's category should be matched against, for
/// use with [`Allowlist::matches`]. `tool` names the nominated override key
/// for Python-tool metadata directives; its absence is not an error.
pub fn extraction_target(name: &str, arguments: &str) -> Option<String> {
    let category = category_of(name);
    let value: serde_json::Value = serde_json::from_str(arguments).ok()?;
    let object = value.as_object()?;

    let keys: &[&str] = match category {
        GateCategory::FileRead | GateCategory::FileWrite => {
            &["path", "file_path", "filepath", "filename"]
        }
        GateCategory::Network => &["url"],
        GateCategory::Shell => &["command"],
        _ => return Some(arguments.to_string()),
    };

    for key in keys {
        if let Some(found) = object.get(*key).and_then(|v| v.as_str()) {
            return Some(found.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_entry_matches_target() {
        let mut allow = Allowlist::new();
        allow.add_regex("web_fetch", r"^https://example\.com/", EntryOrigin::Static);
        assert!(allow.matches(
            "web_fetch",
            GateCategory::Network,
            "https://example.com/v1"
        ));
        assert!(!allow.matches("web_fetch", GateCategory::Network, "https://evil.com/"));
    }

    #[test]
    fn shell_entry_matches_safe_prefix() {
        let mut allow = Allowlist::new();
        allow.add_shell(
            vec!["git".to_string(), "status".to_string()],
            ShellDialect::Unknown,
            EntryOrigin::Static,
        );
        assert!(allow.check_shell("git status -s", ShellDialect::Posix));
    }

    #[test]
    fn shell_entry_never_matches_unsafe_command() {
        let mut allow = Allowlist::new();
        allow.add_shell(
            vec!["git".to_string(), "status".to_string()],
            ShellDialect::Unknown,
            EntryOrigin::Static,
        );
        assert!(!allow.check_shell("git status; rm -rf /", ShellDialect::Posix));
    }

    #[test]
    fn clone_static_into_drops_session_entries() {
        let mut parent = Allowlist::new();
        parent.add_regex("web_fetch", "^https://a/", EntryOrigin::Static);
        parent.add_regex("web_fetch", "^https://b/", EntryOrigin::Session);
        parent.add_shell(vec!["ls".to_string()], ShellDialect::Unknown, EntryOrigin::Session);

        let mut child = Allowlist::new();
        parent.clone_static_into(&mut child);

        assert_eq!(child.regex_len(), 1);
        assert_eq!(child.shell_len(), 0);
        assert!(child.matches("web_fetch", GateCategory::Network, "https://a/x"));
    }

    #[test]
    fn invalid_regex_is_skipped_not_fatal() {
        let mut allow = Allowlist::new();
        allow.add_regex("web_fetch", "(unterminated", EntryOrigin::Static);
        assert!(!allow.matches("web_fetch", GateCategory::Network, "(unterminated"));
    }

    #[test]
    fn extraction_target_reads_known_file_key() {
        let target = extraction_target("write_file", r#"{"file_path":"/tmp/x"}"#).unwrap();
        assert_eq!(target, "/tmp/x");
    }
}
