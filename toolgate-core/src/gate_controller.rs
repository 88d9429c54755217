//! Public façade composing every other module into one `check()` call.

use crate::allowlist::{Allowlist, EntryOrigin};
use crate::config::{ApprovalGateConfig, StaticAllowlistSpec};
use crate::errors::ErrorBody;
use crate::pattern_generator::{self, GeneratedMatch, GeneratedPattern};
use crate::path_identity::PathIdentity;
use crate::policy_engine::{self, PolicyDecision};
use crate::protected_files::ProtectedFiles;
use crate::rate_limiter::RateLimiter;
use crate::types::{ApprovalOutcome, ExtractedArgs, GateCategory, ToolCall};

/// Implemented by whichever interactive surface is available for a call
/// that reaches `PromptRequired`: a local TTY prompt, or a channel that
/// forwards the request to a parent process. The host wires up exactly one
/// of these (preferring a channel when present) and passes it to
/// [`GateController::check`]; passing `None` means neither a TTY nor a
/// channel is available, which `check` treats as `NonInteractiveDenied`.
pub trait ApprovalBackend {
    fn request_approval(&mut self, call: &ToolCall, category: GateCategory) -> ApprovalOutcome;

    /// Confirms a pattern synthesized after an `AllowedAlways` decision.
    fn confirm_pattern(&mut self, pattern: &GeneratedPattern) -> PatternConfirmation;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternConfirmation {
    Confirmed,
    ExactOnly,
    Cancelled,
}

/// Result of one `check()` call.
#[derive(Debug, Clone)]
pub struct GateResult {
    pub outcome: ApprovalOutcome,
    pub path_identity: Option<PathIdentity>,
    pub error: Option<ErrorBody>,
}

impl GateResult {
    fn allowed(outcome: ApprovalOutcome) -> Self {
        Self { outcome, path_identity: None, error: None }
    }

    fn denied(error: ErrorBody) -> Self {
        Self { outcome: ApprovalOutcome::Denied, path_identity: None, error: Some(error) }
    }
}

/// Owns the process-lifetime mutable state the gate needs: configuration,
/// the protected-file inode cache, the compiled allowlist, and per-tool
/// denial trackers, all as one owned value rather than scattered globals.
pub struct GateController {
    config: ApprovalGateConfig,
    protected_files: ProtectedFiles,
    allowlist: Allowlist,
    rate_limiter: RateLimiter,
}

impl GateController {
    pub fn new(config: ApprovalGateConfig) -> Self {
        let mut allowlist = Allowlist::new();
        for spec in &config.allowlist {
            match spec {
                StaticAllowlistSpec::Regex { tool, pattern } => {
                    allowlist.add_regex(tool.clone(), pattern, EntryOrigin::Static);
                }
                StaticAllowlistSpec::ShellPrefix { tokens, dialect } => {
                    allowlist.add_shell(tokens.clone(), *dialect, EntryOrigin::Static);
                }
            }
        }
        Self {
            config,
            protected_files: ProtectedFiles::new(),
            allowlist,
            rate_limiter: RateLimiter::new(),
        }
    }

    pub fn config_mut(&mut self) -> &mut ApprovalGateConfig {
        &mut self.config
    }

    /// Must be called at the start of every tool-call batch so that files
    /// created mid-session are protected.
    pub fn force_refresh_protected_files(&mut self) {
        self.protected_files.force_refresh();
    }

    /// Builds a subagent controller: static config/allowlist only, a fresh
    /// rate limiter, and a fresh protected-file cache.
    pub fn spawn_child(&self) -> Self {
        let (child_config, child_allowlist) = policy_engine::init_from_parent(&self.config, &self.allowlist);
        Self {
            config: child_config,
            protected_files: ProtectedFiles::new(),
            allowlist: child_allowlist,
            rate_limiter: RateLimiter::new(),
        }
    }

    /// Runs one call through protected-file blocking, rate limiting, the
    /// allowlist/policy decision, path-identity verification for file tools,
    /// and, on `AllowedAlways`, pattern generation and confirmation through
    /// `backend`.
    pub fn check(&mut self, call: &ToolCall, mut backend: Option<&mut dyn ApprovalBackend>) -> GateResult {
        let category = crate::category::category_of(&call.name);

        // Step 1: protected-file hard block, unconditional on everything else.
        if category.is_write() {
            if let ExtractedArgs::File { path } = call.extract_args() {
                if self.protected_files.is_protected(std::path::Path::new(&path)) {
                    tracing::warn!(tool = %call.name, %path, "protected file write blocked");
                    return GateResult::denied(ErrorBody::ProtectedFile { path });
                }
            }
        }

        // Step 2: rate limiting.
        if self.rate_limiter.is_rate_limited(&call.name) {
            let retry_after = self.rate_limiter.remaining(&call.name).as_secs();
            tracing::debug!(tool = %call.name, retry_after, "rate limited");
            return GateResult {
                outcome: ApprovalOutcome::RateLimited,
                path_identity: None,
                error: Some(ErrorBody::RateLimited { tool: call.name.clone(), retry_after }),
            };
        }

        // Step 3: policy decision, then dispatch PromptRequired.
        let decision = policy_engine::requires_check(&self.config, &self.allowlist, call);
        let mut outcome = match decision {
            PolicyDecision::Allowed => ApprovalOutcome::Allowed,
            PolicyDecision::Denied => ApprovalOutcome::Denied,
            PolicyDecision::PromptRequired => match backend.as_deref_mut() {
                Some(backend) => backend.request_approval(call, category),
                None => ApprovalOutcome::NonInteractiveDenied,
            },
        };

        if outcome == ApprovalOutcome::NonInteractiveDenied {
            self.rate_limiter.track_denial(&call.name);
            return GateResult {
                outcome,
                path_identity: None,
                error: Some(ErrorBody::NonInteractiveGate {
                    tool: call.name.clone(),
                    category: category.as_str().to_string(),
                    hint: format!(
                        "no TTY or approval channel available; set categories.{}=allow or add an allowlist entry",
                        category.as_str()
                    ),
                }),
            };
        }
        if outcome == ApprovalOutcome::Aborted {
            return GateResult::allowed(ApprovalOutcome::Aborted);
        }

        // Step 4: capture + verify PathIdentity for file tools that passed.
        let mut path_identity = None;
        if category.is_file() && outcome.is_approved() {
            if let ExtractedArgs::File { path } = call.extract_args() {
                match PathIdentity::capture(std::path::Path::new(&path)) {
                    Ok(identity) => match identity.verify() {
                        Ok(()) => path_identity = Some(identity),
                        Err(verify_error) => {
                            tracing::warn!(tool = %call.name, %path, ?verify_error, "path identity verify failed");
                            return self.finish_denied(call, ErrorBody::from_verify_error(path, verify_error));
                        }
                    },
                    Err(verify_error) => {
                        tracing::warn!(tool = %call.name, %path, ?verify_error, "path identity capture failed");
                        return self.finish_denied(call, ErrorBody::from_verify_error(path, verify_error));
                    }
                }
            }
        }

        // On AllowedAlways, run the pattern-generation-and-confirmation
        // round-trip through `backend` now rather than leaving it to the
        // caller; `backend` is guaranteed `Some` here since `AllowedAlways`
        // can only be produced by a backend's `request_approval`.
        if outcome == ApprovalOutcome::AllowedAlways {
            if let Some(backend) = backend.as_deref_mut() {
                outcome = self.confirm_and_install(call, backend);
            }
        }

        match outcome {
            ApprovalOutcome::Denied => self.finish_denied(
                call,
                ErrorBody::OperationDenied { tool: call.name.clone(), category: category.as_str().to_string() },
            ),
            ApprovalOutcome::Allowed | ApprovalOutcome::AllowedAlways => {
                self.rate_limiter.reset(&call.name);
                GateResult { outcome, path_identity, error: None }
            }
            other => GateResult { outcome: other, path_identity, error: None },
        }
    }

    fn finish_denied(&mut self, call: &ToolCall, error: ErrorBody) -> GateResult {
        self.rate_limiter.track_denial(&call.name);
        GateResult::denied(error)
    }

    /// Installs a confirmed [`GeneratedPattern`] into the allowlist as a
    /// session entry.
    pub fn install_pattern(&mut self, tool: &str, pattern: &GeneratedMatch) {
        match pattern {
            GeneratedMatch::Regex(regex) => {
                self.allowlist.add_regex(tool.to_string(), regex, EntryOrigin::Session);
            }
            GeneratedMatch::ShellPrefix(tokens) => {
                self.allowlist.add_shell(tokens.clone(), toolgate_shell::ShellDialect::Unknown, EntryOrigin::Session);
            }
        }
    }

    /// Runs the pattern workflow for a call that already resolved to
    /// `AllowedAlways`: generate, confirm via `backend`, and install on
    /// confirmation. A cancelled confirmation leaves the allowlist untouched
    /// and downgrades the returned outcome to `Allowed`. Public so a caller
    /// that already holds a separate `backend` reference (outside a `check`
    /// call) can still run the workflow directly.
    pub fn confirm_and_install(
        &mut self,
        call: &ToolCall,
        backend: &mut dyn ApprovalBackend,
    ) -> ApprovalOutcome {
        let pattern = pattern_generator::generate(call, true);
        match backend.confirm_pattern(&pattern) {
            PatternConfirmation::Confirmed => {
                self.install_pattern(&call.name, &pattern.target);
                ApprovalOutcome::AllowedAlways
            }
            PatternConfirmation::ExactOnly => {
                let exact = exact_match_for(call);
                self.install_pattern(&call.name, &exact);
                ApprovalOutcome::AllowedAlways
            }
            PatternConfirmation::Cancelled => ApprovalOutcome::Allowed,
        }
    }
}

fn exact_match_for(call: &ToolCall) -> GeneratedMatch {
    match call.extract_args() {
        ExtractedArgs::Shell { command } => {
            let parsed = toolgate_shell::parse(toolgate_shell::ShellDialect::Unknown, &command);
            GeneratedMatch::ShellPrefix(parsed.tokens)
        }
        ExtractedArgs::File { path } => GeneratedMatch::Regex(format!("^{}$", regex::escape(&path))),
        ExtractedArgs::Network { url } => GeneratedMatch::Regex(format!("^{}$", regex::escape(&url))),
        ExtractedArgs::Other { raw } => GeneratedMatch::Regex(format!("^{}$", regex::escape(&raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GateAction;
    use tempfile::TempDir;

    struct AlwaysAllow;
    impl ApprovalBackend for AlwaysAllow {
        fn request_approval(&mut self, _call: &ToolCall, _category: GateCategory) -> ApprovalOutcome {
            ApprovalOutcome::Allowed
        }
        fn confirm_pattern(&mut self, _pattern: &GeneratedPattern) -> PatternConfirmation {
            PatternConfirmation::Confirmed
        }
    }

    struct AlwaysDeny;
    impl ApprovalBackend for AlwaysDeny {
        fn request_approval(&mut self, _call: &ToolCall, _category: GateCategory) -> ApprovalOutcome {
            ApprovalOutcome::Denied
        }
        fn confirm_pattern(&mut self, _pattern: &GeneratedPattern) -> PatternConfirmation {
            PatternConfirmation::Cancelled
        }
    }

    #[test]
    fn protected_file_write_is_always_denied() {
        let dir = TempDir::new().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(&env_path, b"secret").unwrap();

        let mut config = ApprovalGateConfig::default();
        config.enable_yolo(); // even with gating fully disabled
        let mut controller = GateController::new(config);
        let call = ToolCall::new(
            "1",
            "write_file",
            &format!(r#"{{"path":"{}"}}"#, env_path.display()),
        );
        let result = controller.check(&call, None);
        assert_eq!(result.outcome, ApprovalOutcome::Denied);
        assert!(matches!(result.error, Some(ErrorBody::ProtectedFile { .. })));
    }

    #[test]
    fn gated_call_without_backend_is_non_interactive_denied() {
        let config = ApprovalGateConfig::default();
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"ls"}"#);
        let result = controller.check(&call, None);
        assert_eq!(result.outcome, ApprovalOutcome::NonInteractiveDenied);
        assert!(matches!(result.error, Some(ErrorBody::NonInteractiveGate { .. })));
    }

    #[test]
    fn allowlisted_shell_prefix_allows_without_prompt() {
        let mut config = ApprovalGateConfig::default();
        config.allowlist.push(StaticAllowlistSpec::ShellPrefix {
            tokens: vec!["git".to_string(), "status".to_string()],
            dialect: toolgate_shell::ShellDialect::Unknown,
        });
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"git status -s"}"#);
        let result = controller.check(&call, None);
        assert_eq!(result.outcome, ApprovalOutcome::Allowed);
    }

    #[test]
    fn chain_operator_defeats_allowlist_and_prompts() {
        let mut config = ApprovalGateConfig::default();
        config.allowlist.push(StaticAllowlistSpec::ShellPrefix {
            tokens: vec!["git".to_string(), "status".to_string()],
            dialect: toolgate_shell::ShellDialect::Unknown,
        });
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"git status; rm -rf /"}"#);
        let mut backend = AlwaysDeny;
        let result = controller.check(&call, Some(&mut backend));
        assert_eq!(result.outcome, ApprovalOutcome::Denied);
    }

    #[test]
    fn three_denials_rate_limit_the_fourth_call() {
        let config = ApprovalGateConfig::default();
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"ls"}"#);
        let mut backend = AlwaysDeny;
        for _ in 0..3 {
            let result = controller.check(&call, Some(&mut backend));
            assert_eq!(result.outcome, ApprovalOutcome::Denied);
        }
        let result = controller.check(&call, Some(&mut backend));
        assert_eq!(result.outcome, ApprovalOutcome::RateLimited);
    }

    #[test]
    fn allowed_file_write_captures_path_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let config = ApprovalGateConfig::default();
        let mut controller = GateController::new(config);
        let call = ToolCall::new(
            "1",
            "write_file",
            &format!(r#"{{"path":"{}"}}"#, path.display()),
        );
        let mut backend = AlwaysAllow;
        let result = controller.check(&call, Some(&mut backend));
        assert_eq!(result.outcome, ApprovalOutcome::Allowed);
        assert!(result.path_identity.is_some());
    }

    #[test]
    fn approval_resets_prior_denials() {
        let config = ApprovalGateConfig::default();
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"ls"}"#);
        let mut deny_backend = AlwaysDeny;
        controller.check(&call, Some(&mut deny_backend));
        controller.check(&call, Some(&mut deny_backend));
        let mut allow_backend = AlwaysAllow;
        let result = controller.check(&call, Some(&mut allow_backend));
        assert_eq!(result.outcome, ApprovalOutcome::Allowed);
        assert!(!controller.rate_limiter.is_rate_limited("run_terminal_cmd"));
    }

    #[test]
    fn spawn_child_preserves_static_allowlist_only() {
        let mut config = ApprovalGateConfig::default();
        config.allowlist.push(StaticAllowlistSpec::ShellPrefix {
            tokens: vec!["git".to_string(), "status".to_string()],
            dialect: toolgate_shell::ShellDialect::Unknown,
        });
        let parent = GateController::new(config);
        let mut child = parent.spawn_child();
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"git status -s"}"#);
        let result = child.check(&call, None);
        assert_eq!(result.outcome, ApprovalOutcome::Allowed);
    }

    #[test]
    fn confirm_and_install_adds_session_allowlist_entry() {
        let config = ApprovalGateConfig::default();
        let mut controller = GateController::new(config);
        let call = ToolCall::new("1", "web_fetch", r#"{"url":"https://api.example.com/v1"}"#);
        let mut backend = AlwaysAllow;
        let outcome = controller.confirm_and_install(&call, &mut backend);
        assert_eq!(outcome, ApprovalOutcome::AllowedAlways);

        let next_call = ToolCall::new("2", "web_fetch", r#"{"url":"https://api.example.com/v2"}"#);
        let result = controller.check(&next_call, None);
        assert_eq!(result.outcome, ApprovalOutcome::Allowed);
    }
}
