use serde::Serialize;
use thiserror::Error;

/// Closed set of reasons a captured [`crate::path_identity::PathIdentity`]
/// failed to verify, or a `verify_and_open` failed. Callers match on this;
/// it is never downcast from `anyhow::Error`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("path is not valid")]
    InvalidPath,
    #[error("refusing to follow a symlink at the approved path")]
    IsSymlink,
    #[error("file was deleted since approval")]
    Deleted,
    #[error("failed to open path")]
    OpenFailed,
    #[error("failed to stat path")]
    StatFailed,
    #[error("file identity changed since approval")]
    IdentityChanged,
    #[error("parent directory identity changed since approval")]
    ParentChanged,
    #[error("parent directory is no longer accessible")]
    ParentInaccessible,
    #[error("file already exists")]
    AlreadyExists,
    #[error("failed to create file")]
    CreateFailed,
    #[error("path is on a network filesystem; identity checks are advisory")]
    NetworkFsWarning,
}

impl VerifyError {
    /// The stable `error` tag used in the JSON error body.
    pub fn error_tag(self) -> &'static str {
        match self {
            Self::InvalidPath => "invalid_path",
            Self::IsSymlink => "symlink_rejected",
            Self::Deleted => "path_changed",
            Self::OpenFailed => "path_changed",
            Self::StatFailed => "path_changed",
            Self::IdentityChanged => "path_changed",
            Self::ParentChanged => "path_changed",
            Self::ParentInaccessible => "path_changed",
            Self::AlreadyExists => "file_exists",
            Self::CreateFailed => "path_changed",
            Self::NetworkFsWarning => "network_fs_warning",
        }
    }

    /// The verify-error reason string embedded in a `path_changed` body.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::IdentityChanged => "identity_changed",
            Self::ParentChanged => "parent_changed",
            Self::ParentInaccessible => "parent_inaccessible",
            Self::OpenFailed => "open_failed",
            Self::StatFailed => "stat_failed",
            Self::CreateFailed => "create_failed",
            other => other.error_tag(),
        }
    }
}

/// A structured JSON error body returned from the gate to the caller.
/// Tool names and paths are JSON-escaped by virtue of going through
/// `serde_json::to_string`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ErrorBody {
    ProtectedFile { path: String },
    OperationDenied { tool: String, category: String },
    RateLimited { tool: String, retry_after: u64 },
    NonInteractiveGate { tool: String, category: String, hint: String },
    PathChanged { path: String, reason: String },
    SymlinkRejected { path: String },
    FileExists { path: String },
    NetworkFsWarning { path: String },
}

impl ErrorBody {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"error\":\"operation_denied\"}".to_string())
    }

    /// Builds the error body for a [`VerifyError`] surfaced from
    /// `PathIdentity::verify`/`verify_and_open`, keyed off its stable tag.
    pub fn from_verify_error(path: impl Into<String>, error: VerifyError) -> Self {
        let path = path.into();
        match error.error_tag() {
            "symlink_rejected" => Self::SymlinkRejected { path },
            "file_exists" => Self::FileExists { path },
            "network_fs_warning" => Self::NetworkFsWarning { path },
            _ => Self::PathChanged {
                path,
                reason: error.reason().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_file_body_escapes_path() {
        let body = ErrorBody::ProtectedFile {
            path: "/work/\".env\"".to_string(),
        };
        let json = body.to_json();
        assert!(json.contains("\"error\":\"protected_file\""));
        assert!(json.contains("\\\""));
    }

    #[test]
    fn verify_error_tags_match_spec() {
        assert_eq!(VerifyError::IsSymlink.error_tag(), "symlink_rejected");
        assert_eq!(VerifyError::AlreadyExists.error_tag(), "file_exists");
        assert_eq!(VerifyError::Deleted.error_tag(), "path_changed");
        assert_eq!(VerifyError::Deleted.reason(), "deleted");
    }
}
