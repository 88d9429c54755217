//! Child-side half of the approval channel: forwards every gated request
//! to the parent and blocks for its response.

use std::io::{Read, Write};

use toolgate_core::{
    ApprovalBackend, ApprovalOutcome, GateCategory, GeneratedPattern, PatternConfirmation, ToolCall,
};

use crate::error::ChannelError;
use crate::framing::{read_frame, write_frame};
use crate::protocol::{PatternConfirmationWire, RequestMessage, ResponseBody, ResponseMessage};

/// Implements [`ApprovalBackend`] by forwarding each request over
/// `request_writer`/`response_reader` to a parent process running
/// [`crate::parent::ParentMultiplexer`]. Only one outstanding request is
/// ever in flight (the gate check is synchronous), so the streams are
/// used in strict request/response lockstep.
///
/// Once a read or write fails, the channel is permanently collapsed:
/// every subsequent call returns `NonInteractiveDenied`/`Cancelled`
/// without touching the streams again.
pub struct ChildChannel<W: Write, R: Read> {
    request_writer: W,
    response_reader: R,
    next_seq: u64,
    failed: bool,
}

impl<W: Write, R: Read> ChildChannel<W, R> {
    pub fn new(request_writer: W, response_reader: R) -> Self {
        Self { request_writer, response_reader, next_seq: 1, failed: false }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn roundtrip(&mut self, request: RequestMessage) -> Result<ResponseBody, ChannelError> {
        if self.failed {
            return Err(ChannelError::Closed);
        }
        let seq = request.seq();
        let outcome = (|| -> Result<ResponseBody, ChannelError> {
            write_frame(&mut self.request_writer, &request)?;
            let response: ResponseMessage = read_frame(&mut self.response_reader)?;
            if response.seq != seq {
                return Err(ChannelError::SequenceMismatch { expected: seq, got: response.seq });
            }
            Ok(response.body)
        })();
        if outcome.is_err() {
            self.failed = true;
        }
        outcome
    }
}

impl<W: Write, R: Read> ApprovalBackend for ChildChannel<W, R> {
    fn request_approval(&mut self, call: &ToolCall, category: GateCategory) -> ApprovalOutcome {
        let seq = self.next_seq();
        let request = RequestMessage::ApprovalRequest { seq, tool_call: call.clone(), category };
        match self.roundtrip(request) {
            Ok(ResponseBody::Approval { outcome, .. }) => outcome,
            Ok(ResponseBody::PatternConfirm { .. }) => {
                tracing::warn!("approval channel: parent answered with the wrong response kind");
                self.failed = true;
                ApprovalOutcome::NonInteractiveDenied
            }
            Err(error) => {
                tracing::warn!(%error, "approval channel request failed; treating as non-interactive");
                ApprovalOutcome::NonInteractiveDenied
            }
        }
    }

    fn confirm_pattern(&mut self, pattern: &GeneratedPattern) -> PatternConfirmation {
        let seq = self.next_seq();
        let request = RequestMessage::PatternConfirm { seq, pattern: pattern.clone() };
        match self.roundtrip(request) {
            Ok(ResponseBody::PatternConfirm { confirmation }) => confirmation.into(),
            Ok(ResponseBody::Approval { .. }) => {
                tracing::warn!("approval channel: parent answered with the wrong response kind");
                self.failed = true;
                PatternConfirmation::Cancelled
            }
            Err(error) => {
                tracing::warn!(%error, "approval channel pattern confirmation failed; cancelling");
                PatternConfirmation::Cancelled
            }
        }
    }
}

/// Helper the parent side can use to build a [`PatternConfirmationWire`]
/// response body (kept here so both ends agree on the conversion point).
pub fn confirmation_response(seq: u64, confirmation: PatternConfirmationWire) -> ResponseMessage {
    ResponseMessage { seq, body: ResponseBody::PatternConfirm { confirmation } }
}
