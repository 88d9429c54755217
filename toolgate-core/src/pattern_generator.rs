//! Synthesizes a broader allowlist entry from one approved call.

use serde::{Deserialize, Serialize};
use toolgate_shell::{parse, ShellDialect};

use crate::types::{ExtractedArgs, ToolCall};

/// What form a generated pattern takes once confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GeneratedMatch {
    Regex(String),
    ShellPrefix(Vec<String>),
}

/// A candidate broadened allowlist entry, pending user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPattern {
    pub target: GeneratedMatch,
    pub is_exact_match: bool,
    pub needs_confirmation: bool,
    pub examples: Vec<String>,
}

/// Produces a [`GeneratedPattern`] for `call`, dispatching on its extracted
/// argument kind. Without a TTY, the result is forced to an exact match on
/// the literal call rather than the widened pattern.
pub fn generate(call: &ToolCall, has_tty: bool) -> GeneratedPattern {
    let args = call.extract_args();
    if !has_tty {
        return match &args {
            ExtractedArgs::File { path } => exact_regex(path),
            ExtractedArgs::Network { url } => exact_regex(url),
            ExtractedArgs::Other { raw } => exact_regex(raw),
            ExtractedArgs::Shell { command } => {
                let parsed = parse(ShellDialect::Unknown, command);
                GeneratedPattern {
                    target: GeneratedMatch::ShellPrefix(parsed.tokens.clone()),
                    is_exact_match: true,
                    needs_confirmation: false,
                    examples: vec![command.clone()],
                }
            }
        };
    }

    match args {
        ExtractedArgs::File { path } => generate_for_path(&path),
        ExtractedArgs::Shell { command } => generate_for_shell(&command),
        ExtractedArgs::Network { url } => generate_for_url(&url),
        ExtractedArgs::Other { raw } => exact_regex(&raw),
    }
}

fn generate_for_path(path: &str) -> GeneratedPattern {
    let stripped = path.strip_prefix("./").unwrap_or(path);

    if !stripped.contains('/') {
        return exact_regex(path);
    }
    if normalized_under_tmp(stripped) {
        return exact_regex(path);
    }

    let Some((dir, basename)) = stripped.rsplit_once('/') else {
        return exact_regex(path);
    };
    let Some(dot) = basename.rfind('.') else {
        return exact_regex(path);
    };
    let extension = &basename[dot..];
    let stem = &basename[..dot];

    let token_prefix = stem
        .find('_')
        .map(|index| &stem[..=index])
        .unwrap_or("");

    let pattern = format!(
        "^{}/{}.*{}$",
        regex::escape(dir),
        regex::escape(token_prefix),
        regex::escape(extension)
    );
    GeneratedPattern {
        target: GeneratedMatch::Regex(pattern),
        is_exact_match: false,
        needs_confirmation: true,
        examples: vec![
            format!("{}/{}example{}", dir, token_prefix, extension),
            path.to_string(),
        ],
    }
}

fn normalized_under_tmp(path: &str) -> bool {
    path.starts_with("/tmp/") || path.starts_with("tmp/")
}

fn exact_regex(literal: &str) -> GeneratedPattern {
    GeneratedPattern {
        target: GeneratedMatch::Regex(format!("^{}$", regex::escape(literal))),
        is_exact_match: true,
        needs_confirmation: false,
        examples: vec![literal.to_string()],
    }
}

fn generate_for_shell(command: &str) -> GeneratedPattern {
    let parsed = parse(ShellDialect::Unknown, command);
    if !parsed.is_safe_for_matching() {
        return GeneratedPattern {
            target: GeneratedMatch::ShellPrefix(parsed.tokens.clone()),
            is_exact_match: true,
            needs_confirmation: false,
            examples: vec![command.to_string()],
        };
    }

    let prefix_len = parsed.tokens.len().min(2);
    let prefix: Vec<String> = parsed.tokens[..prefix_len].to_vec();
    let is_exact_match = parsed.tokens.len() <= prefix_len;

    GeneratedPattern {
        examples: vec![prefix.join(" "), command.to_string()],
        target: GeneratedMatch::ShellPrefix(prefix),
        is_exact_match,
        needs_confirmation: !is_exact_match,
    }
}

fn generate_for_url(url: &str) -> GeneratedPattern {
    let Some((scheme, rest)) = url.split_once("://") else {
        return exact_regex(url);
    };
    let host_end = rest
        .find(|c| matches!(c, ':' | '/' | '?'))
        .unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() {
        return exact_regex(url);
    }

    // Anchors on a trailing `/` or end-of-string so `example.com.evil.com`
    // never matches a pattern generated from `https://example.com`.
    let pattern = format!("^{}://{}(/|$)", regex::escape(scheme), regex::escape(host));
    GeneratedPattern {
        target: GeneratedMatch::Regex(pattern),
        is_exact_match: false,
        needs_confirmation: true,
        examples: vec![format!("{}://{}/", scheme, host), url.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall::new("1", name, arguments)
    }

    #[test]
    fn cwd_root_file_is_exact_match() {
        let pattern = generate(&call("write_file", r#"{"path":"./README.md"}"#), true);
        assert!(pattern.is_exact_match);
        assert!(!pattern.needs_confirmation);
    }

    #[test]
    fn tmp_path_is_exact_match() {
        let pattern = generate(&call("write_file", r#"{"path":"/tmp/scratch.log"}"#), true);
        assert!(pattern.is_exact_match);
    }

    #[test]
    fn extension_path_widens_with_token_prefix_preserved() {
        let pattern = generate(&call("write_file", r#"{"path":"/work/tests/test_foo.c"}"#), true);
        assert!(!pattern.is_exact_match);
        match pattern.target {
            GeneratedMatch::Regex(regex) => {
                assert!(regex.contains("test_"));
                assert!(regex.ends_with(r"\.c$"));
            }
            _ => panic!("expected regex pattern"),
        }
    }

    #[test]
    fn path_without_extension_is_exact_match() {
        let pattern = generate(&call("write_file", r#"{"path":"/work/bin/tool"}"#), true);
        assert!(pattern.is_exact_match);
    }

    #[test]
    fn safe_shell_command_widens_to_two_token_prefix() {
        let pattern = generate(&call("run_terminal_cmd", r#"{"command":"git status -s"}"#), true);
        assert!(!pattern.is_exact_match);
        match pattern.target {
            GeneratedMatch::ShellPrefix(tokens) => {
                assert_eq!(tokens, vec!["git".to_string(), "status".to_string()])
            }
            _ => panic!("expected shell prefix"),
        }
    }

    #[test]
    fn unsafe_shell_command_is_exact_only() {
        let pattern = generate(
            &call("run_terminal_cmd", r#"{"command":"git status; rm -rf /"}"#),
            true,
        );
        assert!(pattern.is_exact_match);
        assert!(!pattern.needs_confirmation);
    }

    #[test]
    fn url_pattern_rejects_subdomain_spoofing() {
        let pattern = generate(
            &call("web_fetch", r#"{"url":"https://api.example.com/v1"}"#),
            true,
        );
        match pattern.target {
            GeneratedMatch::Regex(regex) => {
                let compiled = regex::Regex::new(&regex).unwrap();
                assert!(compiled.is_match("https://api.example.com/v2"));
                assert!(!compiled.is_match("https://api.example.com.evil.com/"));
            }
            _ => panic!("expected regex pattern"),
        }
    }

    #[test]
    fn without_tty_result_is_forced_exact() {
        let pattern = generate(
            &call("web_fetch", r#"{"url":"https://api.example.com/v1"}"#),
            false,
        );
        assert!(pattern.is_exact_match);
        assert!(!pattern.needs_confirmation);
    }
}
