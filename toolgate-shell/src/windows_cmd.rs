//! `cmd.exe` tokenization.

pub(crate) struct TokenizeResult {
    pub tokens: Vec<String>,
    pub has_chain: bool,
    pub has_pipe: bool,
    pub has_redirect: bool,
    pub has_subshell: bool,
    pub balanced_quotes: bool,
}

/// Splits a `cmd.exe` command line into tokens.
///
/// Only double quotes are honored; `^` escapes the next character
/// (including itself); backslashes are ordinary path characters, never
/// escapes. `%VAR%` and `!VAR!` (delayed expansion) both flag
/// `has_subshell` since either can smuggle in command text at run time.
pub(crate) fn tokenize(input: &str) -> TokenizeResult {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut in_quotes = false;
    let mut escaped = false;

    let mut has_chain = false;
    let mut has_pipe = false;
    let mut has_redirect = false;
    let mut has_subshell = false;

    let mut flush = |tokens: &mut Vec<String>, current: &mut String, has_token: &mut bool| {
        if *has_token {
            tokens.push(std::mem::take(current));
            *has_token = false;
        }
    };

    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];

        if escaped {
            current.push(c);
            has_token = true;
            escaped = false;
            i += 1;
            continue;
        }

        if in_quotes {
            match c {
                '^' => {
                    escaped = true;
                    i += 1;
                }
                '"' => {
                    in_quotes = false;
                    i += 1;
                }
                '%' | '!' => {
                    has_subshell = true;
                    current.push(c);
                    has_token = true;
                    i += 1;
                }
                _ => {
                    current.push(c);
                    has_token = true;
                    i += 1;
                }
            }
            continue;
        }

        match c {
            '^' => {
                escaped = true;
                i += 1;
            }
            '"' => {
                in_quotes = true;
                has_token = true;
                i += 1;
            }
            '%' | '!' => {
                has_subshell = true;
                current.push(c);
                has_token = true;
                i += 1;
            }
            ' ' | '\t' | '\r' | '\n' => {
                flush(&mut tokens, &mut current, &mut has_token);
                i += 1;
            }
            '&' => {
                has_chain = true;
                flush(&mut tokens, &mut current, &mut has_token);
                if i + 1 < chars.len() && chars[i + 1] == '&' {
                    i += 2;
                } else {
                    i += 1;
                }
            }
            '|' => {
                flush(&mut tokens, &mut current, &mut has_token);
                if i + 1 < chars.len() && chars[i + 1] == '|' {
                    has_chain = true;
                    i += 2;
                } else {
                    has_pipe = true;
                    i += 1;
                }
            }
            '>' => {
                has_redirect = true;
                flush(&mut tokens, &mut current, &mut has_token);
                if i + 1 < chars.len() && chars[i + 1] == '>' {
                    i += 2;
                } else {
                    i += 1;
                }
            }
            '<' => {
                has_redirect = true;
                flush(&mut tokens, &mut current, &mut has_token);
                i += 1;
            }
            _ => {
                current.push(c);
                has_token = true;
                i += 1;
            }
        }
    }
    flush(&mut tokens, &mut current, &mut has_token);

    TokenizeResult {
        tokens,
        has_chain,
        has_pipe,
        has_redirect,
        has_subshell,
        balanced_quotes: !in_quotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command() {
        let r = tokenize("dir /w");
        assert_eq!(r.tokens, vec!["dir", "/w"]);
    }

    #[test]
    fn caret_escapes_next_char() {
        let r = tokenize("echo ^&literal");
        assert_eq!(r.tokens, vec!["echo", "&literal"]);
        assert!(!r.has_chain);
    }

    #[test]
    fn percent_var_sets_subshell() {
        let r = tokenize("echo %PATH%");
        assert!(r.has_subshell);
    }

    #[test]
    fn chain_detected() {
        let r = tokenize("dir && del file.txt");
        assert!(r.has_chain);
    }

    #[test]
    fn unterminated_quote_is_unsafe() {
        let r = tokenize(r#"echo "unterminated"#);
        assert!(!r.balanced_quotes);
    }
}
