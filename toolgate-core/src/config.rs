use std::collections::HashMap;

use serde_json::Value;

use toolgate_shell::ShellDialect;

use crate::types::{GateAction, GateCategory};

/// The `approval_gates` object at the top level of the host configuration
/// file. Parsed once at controller initialization; malformed
/// documents fall back to [`ApprovalGateConfig::default`] with a
/// `tracing::warn!`, never a panic.
#[derive(Debug, Clone)]
pub struct ApprovalGateConfig {
    pub enabled: bool,
    pub categories: HashMap<GateCategory, GateAction>,
    pub allowlist: Vec<StaticAllowlistSpec>,
}

/// One allowlist entry as read from configuration, before compilation.
#[derive(Debug, Clone)]
pub enum StaticAllowlistSpec {
    Regex { tool: String, pattern: String },
    ShellPrefix {
        tokens: Vec<String>,
        dialect: ShellDialect,
    },
}

impl Default for ApprovalGateConfig {
    fn default() -> Self {
        let mut categories = HashMap::new();
        categories.insert(GateCategory::FileRead, GateAction::Allow);
        categories.insert(GateCategory::FileWrite, GateAction::Gate);
        categories.insert(GateCategory::Shell, GateAction::Gate);
        categories.insert(GateCategory::Network, GateAction::Gate);
        categories.insert(GateCategory::Memory, GateAction::Allow);
        categories.insert(GateCategory::Subagent, GateAction::Gate);
        categories.insert(GateCategory::Mcp, GateAction::Gate);
        categories.insert(GateCategory::Python, GateAction::Allow);

        Self {
            enabled: true,
            categories,
            allowlist: Vec::new(),
        }
    }
}

impl ApprovalGateConfig {
    /// Parses a whole host configuration-file JSON document and extracts
    /// the `approval_gates` key. Any problem (missing key, malformed JSON,
    /// unknown category/action names, malformed entries) is logged with
    /// `tracing::warn!` and defaults apply for the affected piece only.
    pub fn from_host_config_json(document: &str) -> Self {
        let root: Value = match serde_json::from_str(document) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "malformed host configuration JSON; using default approval gate config");
                return Self::default();
            }
        };
        let Some(gates) = root.get("approval_gates") else {
            return Self::default();
        };
        Self::from_json_value(gates)
    }

    fn from_json_value(value: &Value) -> Self {
        let mut config = Self::default();

        if let Some(enabled) = value.get("enabled").and_then(Value::as_bool) {
            config.enabled = enabled;
        }

        if let Some(categories) = value.get("categories").and_then(Value::as_object) {
            for (name, action_value) in categories {
                let Some(category) = GateCategory::parse_name(name) else {
                    tracing::warn!(category = %name, "unknown approval gate category; skipping");
                    continue;
                };
                let Some(action_name) = action_value.as_str() else {
                    tracing::warn!(category = %name, "non-string category action; skipping");
                    continue;
                };
                let Some(action) = GateAction::parse_name(action_name) else {
                    tracing::warn!(category = %name, action = %action_name, "unknown action name; skipping");
                    continue;
                };
                config.categories.insert(category, action);
            }
        }

        if let Some(entries) = value.get("allowlist").and_then(Value::as_array) {
            for entry in entries {
                match parse_allowlist_entry(entry) {
                    Some(spec) => config.allowlist.push(spec),
                    None => tracing::warn!(entry = %entry, "malformed allowlist entry; skipping"),
                }
            }
        }

        config
    }

    /// CLI surface: `enable_yolo()` disables gating entirely.
    pub fn enable_yolo(&mut self) {
        self.enabled = false;
    }

    /// CLI surface: `set_category_action(name, action)`.
    pub fn set_category_action(&mut self, category: GateCategory, action: GateAction) {
        self.categories.insert(category, action);
    }

    /// CLI surface: `add_cli_allow("tool:pattern")`. For `shell`, the
    /// pattern is a comma-separated token list; for anything else it is a
    /// regex applied to the tool's extracted match target.
    pub fn add_cli_allow(&mut self, spec: &str) -> bool {
        let Some((tool, pattern)) = spec.split_once(':') else {
            tracing::warn!(spec = %spec, "malformed CLI allow spec; expected tool:pattern");
            return false;
        };
        if tool == "shell" {
            let tokens: Vec<String> = pattern
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if tokens.is_empty() {
                return false;
            }
            self.allowlist.push(StaticAllowlistSpec::ShellPrefix {
                tokens,
                dialect: ShellDialect::Unknown,
            });
        } else {
            self.allowlist.push(StaticAllowlistSpec::Regex {
                tool: tool.to_string(),
                pattern: pattern.to_string(),
            });
        }
        true
    }
}

fn parse_allowlist_entry(entry: &Value) -> Option<StaticAllowlistSpec> {
    let object = entry.as_object()?;
    let tool = object.get("tool")?.as_str()?.to_string();

    if tool == "shell" {
        let command = object.get("command")?.as_array()?;
        let tokens: Vec<String> = command
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            return None;
        }
        let dialect = object
            .get("shell")
            .and_then(Value::as_str)
            .and_then(ShellDialect::parse_name)
            .unwrap_or(ShellDialect::Unknown);
        return Some(StaticAllowlistSpec::ShellPrefix { tokens, dialect });
    }

    let pattern = object.get("pattern")?.as_str()?.to_string();
    Some(StaticAllowlistSpec::Regex { tool, pattern })
}
