//! TTY approval dialogs for the approval gate subsystem.
//!
//! [`ApprovalPrompt`] implements `toolgate_core::ApprovalBackend` so it can
//! be handed directly to `GateController::check` whenever the process owns
//! a TTY; [`ApprovalPrompt::prompt_batch`] drives the numbered multi-call
//! dialog for a batch of pending approvals.

mod keypress;
mod prompt;
mod terminal;

pub use prompt::ApprovalPrompt;
