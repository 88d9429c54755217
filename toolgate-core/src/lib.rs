//! Policy engine, filesystem identity, and approval-gate data model for the
//! agentic tool runner's Approval Gate subsystem.
//!
//! [`gate_controller::GateController`] is the public entry point: it
//! composes [`protected_files::ProtectedFiles`], [`allowlist::Allowlist`],
//! [`rate_limiter::RateLimiter`], [`policy_engine`], and
//! [`path_identity::PathIdentity`] into a single `check()` call per tool
//! invocation. TTY and IPC approval surfaces live in separate crates and
//! plug in through [`gate_controller::ApprovalBackend`].

mod allowlist;
mod category;
mod config;
mod errors;
mod gate_controller;
mod pattern_generator;
mod path_identity;
mod policy_engine;
mod protected_files;
mod rate_limiter;
mod types;

pub use allowlist::{extraction_target, Allowlist, EntryOrigin};
pub use config::{ApprovalGateConfig, StaticAllowlistSpec};
pub use errors::{ErrorBody, VerifyError};
pub use gate_controller::{ApprovalBackend, GateController, GateResult, PatternConfirmation};
pub use pattern_generator::{generate as generate_pattern, GeneratedMatch, GeneratedPattern};
pub use path_identity::{ExistingIdentity, NewIdentity, OpenMode, PathIdentity};
pub use policy_engine::{init_from_parent, requires_check, PolicyDecision};
pub use protected_files::ProtectedFiles;
pub use rate_limiter::RateLimiter;
pub use types::{ApprovalOutcome, ExtractedArgs, GateAction, GateCategory, ToolCall};

pub use category::category_of;
