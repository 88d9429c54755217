//! IPC approval-proxy protocol between a subagent and its parent.
//!
//! When a gate runs inside a subagent process that owns no TTY of its own,
//! [`child::ChildChannel`] implements `toolgate_core::ApprovalBackend` by
//! forwarding each request to the parent over a pair of half-duplex byte
//! streams; [`parent::ParentMultiplexer`] is the parent-side counterpart
//! that services several children's requests as they arrive, running
//! whatever local approval surface (normally a `toolgate_prompt`) the host
//! wires in.
//!
//! The wire format is a length-prefixed JSON message per request/response:
//! a `u32` big-endian byte count followed by that many bytes of JSON.
//! Read/write errors on either stream collapse the channel; a child
//! whose channel has collapsed treats every gated operation as
//! `NonInteractiveDenied` rather than retrying.

mod child;
mod error;
mod framing;
#[cfg(unix)]
mod pipes;
mod protocol;

pub mod parent;

pub use child::ChildChannel;
pub use error::ChannelError;
pub use parent::{ArrivedRequest, ChildHandle, ParentMultiplexer};
pub use protocol::{PathIdentityWire, PatternConfirmationWire, RequestMessage, ResponseBody, ResponseMessage};

#[cfg(unix)]
pub use pipes::{create_channel_pipes, set_nonblocking, ChannelPipes, PipeReader, PipeWriter};
