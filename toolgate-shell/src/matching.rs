use once_cell::sync::Lazy;

use crate::dialect::ShellDialect;
use crate::parse::ParsedShellCommand;

/// Cross-dialect synonyms consulted only when an allowlist entry's dialect
/// is [`ShellDialect::Unknown`] and the first token doesn't match literally.
static SYNONYMS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("ls", "get-childitem"),
        ("ls", "dir"),
        ("cat", "get-content"),
        ("cat", "type"),
        ("rm", "remove-item"),
        ("cp", "copy-item"),
        ("mv", "move-item"),
        ("pwd", "get-location"),
    ]
});

fn synonyms_equivalent(a: &str, b: &str) -> bool {
    let a = a.to_ascii_lowercase();
    let b = b.to_ascii_lowercase();
    if a == b {
        return true;
    }
    SYNONYMS
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}

/// `matches_prefix(cmd, prefix)`: the command must be safe-for-matching,
/// at least as long as `prefix`, and equal to it
/// token-by-token — with one extension: when `entry_dialect` is
/// [`ShellDialect::Unknown`], the first token may match via the
/// cross-dialect synonym table instead of literal equality.
pub fn matches_prefix(cmd: &ParsedShellCommand, prefix: &[String], entry_dialect: ShellDialect) -> bool {
    if !cmd.is_safe_for_matching() {
        return false;
    }
    if prefix.is_empty() || cmd.tokens.len() < prefix.len() {
        return false;
    }
    if entry_dialect != ShellDialect::Unknown && entry_dialect != cmd.dialect {
        return false;
    }

    let case_insensitive = cmd.dialect == ShellDialect::PowerShell;

    for (i, want) in prefix.iter().enumerate() {
        let got = &cmd.tokens[i];
        let literal_match = if case_insensitive {
            got.eq_ignore_ascii_case(want)
        } else {
            got == want
        };
        if literal_match {
            continue;
        }
        if i == 0 && entry_dialect == ShellDialect::Unknown && synonyms_equivalent(want, got) {
            continue;
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn exact_prefix_matches() {
        let cmd = parse(ShellDialect::Posix, "git status -s");
        let prefix = vec!["git".to_string(), "status".to_string()];
        assert!(matches_prefix(&cmd, &prefix, ShellDialect::Posix));
    }

    #[test]
    fn unsafe_command_never_matches() {
        let cmd = parse(ShellDialect::Posix, "git status; rm -rf /");
        let prefix = vec!["git".to_string(), "status".to_string()];
        assert!(!matches_prefix(&cmd, &prefix, ShellDialect::Posix));
    }

    #[test]
    fn cross_dialect_synonym_matches_unknown_entry() {
        let cmd = parse(ShellDialect::PowerShell, "Get-ChildItem -Path .");
        let prefix = vec!["ls".to_string()];
        assert!(matches_prefix(&cmd, &prefix, ShellDialect::Unknown));
    }

    #[test]
    fn wrong_dialect_entry_does_not_match() {
        let cmd = parse(ShellDialect::PowerShell, "Get-ChildItem -Path .");
        let prefix = vec!["Get-ChildItem".to_string()];
        assert!(!matches_prefix(&cmd, &prefix, ShellDialect::Posix));
    }

    #[test]
    fn too_short_command_does_not_match_longer_prefix() {
        let cmd = parse(ShellDialect::Posix, "git");
        let prefix = vec!["git".to_string(), "status".to_string()];
        assert!(!matches_prefix(&cmd, &prefix, ShellDialect::Posix));
    }
}
