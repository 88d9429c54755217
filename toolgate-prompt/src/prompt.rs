//! Single and batch TTY approval dialogs.

use std::io::IsTerminal;

use toolgate_core::{
    ApprovalBackend, ApprovalOutcome, ExtractedArgs, GateCategory, GeneratedMatch,
    GeneratedPattern, PatternConfirmation, ToolCall,
};

use crate::keypress::{read_key, PromptKey};

const SUMMARY_WIDTH: usize = 72;

/// Drives the interactive TTY approval dialogs. Implements
/// [`ApprovalBackend`] so [`toolgate_core::GateController::check`] can use
/// it directly whenever the process owns a TTY.
#[derive(Default)]
pub struct ApprovalPrompt;

impl ApprovalPrompt {
    pub fn new() -> Self {
        Self
    }

    pub fn has_tty() -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }

    /// Presents the numbered batch dialog for `calls` (all already known to
    /// need approval). Returns a per-call outcome vector plus the aggregate
    /// outcome (`Allowed` iff every call is allowed, `Denied` iff any call
    /// is denied, `AllowedAlways` iff every call is allowed-always).
    pub fn prompt_batch(&mut self, calls: &[(ToolCall, GateCategory)]) -> (Vec<ApprovalOutcome>, ApprovalOutcome) {
        let mut outcomes: Vec<Option<ApprovalOutcome>> = vec![None; calls.len()];

        loop {
            print_batch_listing(calls, &outcomes);
            eprintln!("[y] allow all pending  [n] deny all pending  [1-{}] review one", calls.len());

            let key = match read_key() {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(%error, "batch prompt read failed");
                    PromptKey::Abort
                }
            };

            match key {
                PromptKey::Abort => {
                    for outcome in outcomes.iter_mut() {
                        if outcome.is_none() {
                            *outcome = Some(ApprovalOutcome::Aborted);
                        }
                    }
                    break;
                }
                PromptKey::Char('y') => {
                    for outcome in outcomes.iter_mut() {
                        if outcome.is_none() {
                            *outcome = Some(ApprovalOutcome::Allowed);
                        }
                    }
                    break;
                }
                PromptKey::Char('n') => {
                    for outcome in outcomes.iter_mut() {
                        if outcome.is_none() {
                            *outcome = Some(ApprovalOutcome::Denied);
                        }
                    }
                    break;
                }
                PromptKey::Char(c) if c.is_ascii_digit() => {
                    if let Some(index) = c.to_digit(10).map(|d| d as usize).filter(|i| *i >= 1 && *i <= calls.len()) {
                        let (call, category) = &calls[index - 1];
                        outcomes[index - 1] = Some(self.request_approval(call, *category));
                    }
                }
                _ => {}
            }

            if outcomes.iter().all(Option::is_some) {
                break;
            }
        }

        let resolved: Vec<ApprovalOutcome> = outcomes.into_iter().map(|o| o.unwrap_or(ApprovalOutcome::Denied)).collect();
        let aggregate = if resolved.iter().any(|o| *o == ApprovalOutcome::Denied) {
            ApprovalOutcome::Denied
        } else if resolved.iter().all(|o| *o == ApprovalOutcome::AllowedAlways) {
            ApprovalOutcome::AllowedAlways
        } else if resolved.iter().all(|o| o.is_approved()) {
            ApprovalOutcome::Allowed
        } else {
            ApprovalOutcome::Aborted
        };
        (resolved, aggregate)
    }
}

impl ApprovalBackend for ApprovalPrompt {
    fn request_approval(&mut self, call: &ToolCall, category: GateCategory) -> ApprovalOutcome {
        let summary = summary_line(call, category);

        loop {
            eprintln!("approve {}? [y/n/a/?] {}", category.as_str(), summary);
            let key = match read_key() {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(%error, "approval prompt read failed");
                    return ApprovalOutcome::Aborted;
                }
            };
            match key {
                PromptKey::Abort => return ApprovalOutcome::Aborted,
                PromptKey::Char('y') => return ApprovalOutcome::Allowed,
                PromptKey::Char('n') => return ApprovalOutcome::Denied,
                PromptKey::Char('a') => return ApprovalOutcome::AllowedAlways,
                PromptKey::Char('?') => {
                    print_details(call);
                    continue;
                }
                PromptKey::Char(_) => {
                    eprintln!("invalid key; press y, n, a, or ?");
                    continue;
                }
            }
        }
    }

    fn confirm_pattern(&mut self, pattern: &GeneratedPattern) -> PatternConfirmation {
        if !pattern.needs_confirmation {
            return PatternConfirmation::Confirmed;
        }

        loop {
            eprintln!("generated pattern: {}", describe_pattern(&pattern.target));
            for example in pattern.examples.iter().take(3) {
                eprintln!("  matches: {example}");
            }
            eprintln!("[c] confirm  [e] exact-only  [x] cancel");

            let key = match read_key() {
                Ok(key) => key,
                Err(error) => {
                    tracing::warn!(%error, "pattern confirmation read failed");
                    return PatternConfirmation::Cancelled;
                }
            };
            match key {
                PromptKey::Abort | PromptKey::Char('x') => return PatternConfirmation::Cancelled,
                PromptKey::Char('c') => return PatternConfirmation::Confirmed,
                PromptKey::Char('e') => return PatternConfirmation::ExactOnly,
                PromptKey::Char(_) => {
                    eprintln!("invalid key; press c, e, or x");
                    continue;
                }
            }
        }
    }
}

fn describe_pattern(target: &GeneratedMatch) -> String {
    match target {
        GeneratedMatch::Regex(pattern) => pattern.clone(),
        GeneratedMatch::ShellPrefix(tokens) => tokens.join(" "),
    }
}

fn summary_line(call: &ToolCall, category: GateCategory) -> String {
    let raw = match call.extract_args() {
        ExtractedArgs::Shell { command } => command,
        ExtractedArgs::File { path } => path,
        ExtractedArgs::Network { url } => url,
        ExtractedArgs::Other { raw } => raw,
    };
    let _ = category;
    truncate(&raw, SUMMARY_WIDTH)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let head: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

fn print_details(call: &ToolCall) {
    eprintln!("tool: {}", call.name);
    let pretty = serde_json::from_str::<serde_json::Value>(&call.arguments)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| call.arguments.clone());
    eprintln!("arguments:\n{pretty}");
}

fn print_batch_listing(calls: &[(ToolCall, GateCategory)], outcomes: &[Option<ApprovalOutcome>]) {
    eprintln!("{} tool calls need approval:", calls.len());
    for (index, (call, category)) in calls.iter().enumerate() {
        let marker = match outcomes[index] {
            Some(ApprovalOutcome::Allowed) | Some(ApprovalOutcome::AllowedAlways) => "[allowed]",
            Some(ApprovalOutcome::Denied) => "[denied]",
            Some(ApprovalOutcome::Aborted) => "[aborted]",
            Some(_) => "[resolved]",
            None => "[pending]",
        };
        eprintln!("  {} {} {}", index + 1, marker, summary_line(call, *category));
    }
}
