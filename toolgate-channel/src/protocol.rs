//! Wire types for the two message shapes the protocol carries: an
//! approval request and the pattern-confirmation round trip that follows
//! an `AllowedAlways` decision.

use serde::{Deserialize, Serialize};
use toolgate_core::{ApprovalOutcome, GateCategory, GeneratedPattern, PatternConfirmation, ToolCall};

/// Child → parent. Exactly one outstanding request per channel at a time;
/// `seq` is monotonic per channel and echoed back in the matching
/// [`ResponseMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestMessage {
    ApprovalRequest { seq: u64, tool_call: ToolCall, category: GateCategory },
    PatternConfirm { seq: u64, pattern: GeneratedPattern },
}

impl RequestMessage {
    pub fn seq(&self) -> u64 {
        match self {
            Self::ApprovalRequest { seq, .. } => *seq,
            Self::PatternConfirm { seq, .. } => *seq,
        }
    }
}

/// Parent → child. `seq` must match the most recent request's sequence
/// number; a mismatch is a protocol error that collapses the channel
/// rather than being silently accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub seq: u64,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseBody {
    Approval {
        outcome: ApprovalOutcome,
        /// Present only when the parent itself captured filesystem
        /// identity while handling the request. The child's own
        /// `GateController::check` always performs the authoritative
        /// capture/verify against its own filesystem view regardless of
        /// this field, so most parent implementations leave it `None`.
        path_identity: Option<PathIdentityWire>,
    },
    PatternConfirm {
        confirmation: PatternConfirmationWire,
    },
}

/// Wire-serializable mirror of [`PatternConfirmation`] (which is not
/// itself `Serialize` — it is a plain in-process enum used by
/// `toolgate_core::ApprovalBackend`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternConfirmationWire {
    Confirmed,
    ExactOnly,
    Cancelled,
}

impl From<PatternConfirmation> for PatternConfirmationWire {
    fn from(value: PatternConfirmation) -> Self {
        match value {
            PatternConfirmation::Confirmed => Self::Confirmed,
            PatternConfirmation::ExactOnly => Self::ExactOnly,
            PatternConfirmation::Cancelled => Self::Cancelled,
        }
    }
}

impl From<PatternConfirmationWire> for PatternConfirmation {
    fn from(value: PatternConfirmationWire) -> Self {
        match value {
            PatternConfirmationWire::Confirmed => Self::Confirmed,
            PatternConfirmationWire::ExactOnly => Self::ExactOnly,
            PatternConfirmationWire::Cancelled => Self::Cancelled,
        }
    }
}

/// A serialized form of `toolgate_core::PathIdentity`, carried
/// opportunistically by a parent-side response. Not round-tripped back
/// into a live `PathIdentity`: the child always re-derives its own from
/// the local filesystem, since identity captured in the parent's process
/// may belong to a different mount namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathIdentityWire {
    Existing { user_path: String, resolved_path: String, device: u64, inode: u64 },
    New { user_path: String, resolved_path: String, parent_path: String, parent_device: u64, parent_inode: u64 },
}

/// Helper for a `GateCategory` argument some `RequestMessage` variants
/// carry so the parent's prompt doesn't need to re-derive it from the tool
/// name (category derivation is pure, but the child has already done it).
pub fn approval_request(seq: u64, tool_call: ToolCall, category: GateCategory) -> RequestMessage {
    RequestMessage::ApprovalRequest { seq, tool_call, category }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_request_round_trips_through_json() {
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"ls"}"#);
        let message = approval_request(7, call, GateCategory::Shell);
        let json = serde_json::to_string(&message).unwrap();
        let decoded: RequestMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.seq(), 7);
        assert!(matches!(decoded, RequestMessage::ApprovalRequest { .. }));
    }

    #[test]
    fn response_round_trips_outcome() {
        let response = ResponseMessage {
            seq: 3,
            body: ResponseBody::Approval { outcome: ApprovalOutcome::Allowed, path_identity: None },
        };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: ResponseMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.seq, 3);
        assert!(matches!(
            decoded.body,
            ResponseBody::Approval { outcome: ApprovalOutcome::Allowed, .. }
        ));
    }
}
