use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool-use request from the model, before any policy decision.
///
/// Immutable for the lifetime of a single gate check. `arguments` is the
/// raw JSON text the model produced; it is parsed once into
/// [`ExtractedArgs`] rather than re-parsed by each consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parses `arguments` once into a typed sum instead of re-parsing JSON
    /// every time a field is needed. A malformed-JSON parse error collapses
    /// to `Other` with the raw text: "no extractable target" rather than an
    /// error the caller must handle.
    pub fn extract_args(&self) -> ExtractedArgs {
        let category = crate::category::category_of(&self.name);
        let parsed: Option<Value> = serde_json::from_str(&self.arguments).ok();
        let Some(value) = parsed else {
            return ExtractedArgs::Other {
                raw: self.arguments.clone(),
            };
        };

        match category {
            GateCategory::Shell => {
                if let Some(command) = first_string_field(&value, &["command"]) {
                    return ExtractedArgs::Shell { command };
                }
            }
            GateCategory::FileRead | GateCategory::FileWrite => {
                if let Some(path) =
                    first_string_field(&value, &["path", "file_path", "filepath", "filename"])
                {
                    return ExtractedArgs::File { path };
                }
            }
            GateCategory::Network => {
                if let Some(url) = first_string_field(&value, &["url"]) {
                    return ExtractedArgs::Network { url };
                }
            }
            _ => {}
        }
        ExtractedArgs::Other {
            raw: self.arguments.clone(),
        }
    }
}

fn first_string_field(value: &Value, keys: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    for key in keys {
        if let Some(found) = object.get(*key).and_then(Value::as_str) {
            return Some(found.to_string());
        }
    }
    None
}

/// A tool call's arguments, parsed once into the field(s) the rest of the
/// gate actually needs.
#[derive(Debug, Clone)]
pub enum ExtractedArgs {
    Shell { command: String },
    File { path: String },
    Network { url: String },
    Other { raw: String },
}

/// Coarse-grained bucket of tools sharing a default policy. Derived purely
/// from `ToolCall::name` via [`crate::category::category_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCategory {
    FileRead,
    FileWrite,
    Shell,
    Network,
    Memory,
    Subagent,
    Mcp,
    Python,
}

impl GateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::Shell => "shell",
            Self::Network => "network",
            Self::Memory => "memory",
            Self::Subagent => "subagent",
            Self::Mcp => "mcp",
            Self::Python => "python",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "file_read" => Some(Self::FileRead),
            "file_write" => Some(Self::FileWrite),
            "shell" => Some(Self::Shell),
            "network" => Some(Self::Network),
            "memory" => Some(Self::Memory),
            "subagent" => Some(Self::Subagent),
            "mcp" => Some(Self::Mcp),
            "python" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn is_file(self) -> bool {
        matches!(self, Self::FileRead | Self::FileWrite)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::FileWrite)
    }
}

/// The configured outcome for a [`GateCategory`] before allowlist/rate-limit
/// consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Allow,
    Gate,
    Deny,
}

impl GateAction {
    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "allow" => Some(Self::Allow),
            "gate" => Some(Self::Gate),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// The result of a gate check, handed back to the caller alongside an
/// optional [`crate::path_identity::PathIdentity`] for file tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Allowed,
    AllowedAlways,
    Denied,
    Aborted,
    RateLimited,
    NonInteractiveDenied,
}

impl ApprovalOutcome {
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Allowed | Self::AllowedAlways)
    }
}
