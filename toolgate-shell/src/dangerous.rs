//! Per-dialect dangerous-token detection.
//!
//! A dangerous token refusal is orthogonal to the chain/pipe/redirect/
//! subshell flags: it catches single commands that are unsafe to
//! prefix-match even when nothing else about the command looks unsafe
//! (e.g. a bare `eval "$x"` has no chain/pipe/redirect).

use once_cell::sync::Lazy;

use crate::dialect::ShellDialect;

static POSIX_DANGEROUS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["eval", "exec", "source"]);

static POWERSHELL_DANGEROUS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "invoke-expression",
        "iex",
        "invoke-command",
        "icm",
        "invoke-webrequest",
        "iwr",
        "invoke-restmethod",
        "irm",
        "start-process",
        "-encodedcommand",
        "-enc",
        "downloadstring",
        "downloadfile",
    ]
});

static CMD_DANGEROUS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "format",
        "del",
        "erase",
        "rd",
        "rmdir",
        "shutdown",
        "reg",
        "bitsadmin",
        "certutil",
        "mshta",
    ]
});

/// Returns true if any token (or adjacent token pair) matches the
/// dialect's dangerous-token table.
pub fn is_dangerous(dialect: ShellDialect, tokens: &[String]) -> bool {
    match dialect {
        ShellDialect::Posix | ShellDialect::Unknown => is_posix_dangerous(tokens),
        ShellDialect::PowerShell => is_powershell_dangerous(tokens),
        ShellDialect::Cmd => is_cmd_dangerous(tokens),
    }
}

fn is_posix_dangerous(tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    if POSIX_DANGEROUS.iter().any(|d| tokens[0] == *d) {
        return true;
    }
    // "bash -c", "sh -c" (and zsh, as a reasonable extension of the rule)
    if tokens.len() >= 2 {
        let shells = ["bash", "sh", "zsh"];
        let base = base_name(&tokens[0]);
        if shells.contains(&base.as_str()) && matches!(tokens[1].as_str(), "-c" | "-lc" | "-ic") {
            return true;
        }
    }
    is_rm_rf_root(tokens)
}

fn is_rm_rf_root(tokens: &[String]) -> bool {
    if tokens.is_empty() || base_name(&tokens[0]) != "rm" {
        return false;
    }
    let has_recursive_force = tokens[1..]
        .iter()
        .any(|t| matches!(t.as_str(), "-rf" | "-fr" | "-r" | "-f" | "--recursive" | "--force"));
    let targets_root = tokens[1..]
        .iter()
        .any(|t| matches!(t.as_str(), "/" | "~" | "*" | "/*"));
    has_recursive_force && targets_root
}

fn is_powershell_dangerous(tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|t| POWERSHELL_DANGEROUS.iter().any(|d| t.eq_ignore_ascii_case(d)))
}

fn is_cmd_dangerous(tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    CMD_DANGEROUS
        .iter()
        .any(|d| tokens[0].eq_ignore_ascii_case(d))
}

fn base_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_ascii_lowercase()
}
