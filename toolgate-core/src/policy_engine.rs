//! Category -> action resolution and subagent policy inheritance.

use crate::allowlist::{extraction_target, Allowlist};
use crate::category::category_of;
use crate::config::ApprovalGateConfig;
use crate::types::{GateAction, ToolCall};

/// Outcome of the pure policy decision, before any TTY/channel interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Denied,
    PromptRequired,
}

/// Maps `call` to a [`PolicyDecision`]: gates disabled or an `allow`/`deny`
/// category short-circuits immediately, otherwise the allowlist decides
/// whether a `gate` category needs a prompt.
pub fn requires_check(config: &ApprovalGateConfig, allowlist: &Allowlist, call: &ToolCall) -> PolicyDecision {
    if !config.enabled {
        return PolicyDecision::Allowed;
    }

    let category = category_of(&call.name);
    let action = config
        .categories
        .get(&category)
        .copied()
        .unwrap_or(GateAction::Gate);

    match action {
        GateAction::Allow => PolicyDecision::Allowed,
        GateAction::Deny => PolicyDecision::Denied,
        GateAction::Gate => {
            let Some(target) = extraction_target(&call.name, &call.arguments) else {
                tracing::debug!(tool = %call.name, "no extractable match target; prompting");
                return PolicyDecision::PromptRequired;
            };
            if allowlist.matches(&call.name, category, &target) {
                tracing::debug!(tool = %call.name, "allowlist match");
                PolicyDecision::Allowed
            } else {
                PolicyDecision::PromptRequired
            }
        }
    }
}

/// Builds a subagent's policy config and allowlist from its parent's,
/// preserving `enabled` and the full category map but dropping every
/// session allowlist entry.
pub fn init_from_parent(parent_config: &ApprovalGateConfig, parent_allowlist: &Allowlist) -> (ApprovalGateConfig, Allowlist) {
    let child_config = ApprovalGateConfig {
        enabled: parent_config.enabled,
        categories: parent_config.categories.clone(),
        allowlist: Vec::new(),
    };
    let mut child_allowlist = Allowlist::new();
    parent_allowlist.clone_static_into(&mut child_allowlist);
    (child_config, child_allowlist)
}
