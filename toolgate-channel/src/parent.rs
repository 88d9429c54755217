//! Parent-side multiplexer: services approval requests from any number of
//! children as they arrive, without blocking on a quiet one.

use std::time::{Duration, Instant};

use crate::error::ChannelError;
use crate::framing::{write_frame, FrameAccumulator};
use crate::protocol::{RequestMessage, ResponseBody, ResponseMessage};

use std::io::{Read, Write};

/// One child's half of the channel as seen from the parent: a
/// non-blocking request-read end and a (blocking is fine) response-write
/// end, plus whatever identifying label the host wants to show in logs.
pub struct ChildHandle<R: Read, W: Write> {
    pub label: String,
    request_reader: R,
    response_writer: W,
    accumulator: FrameAccumulator,
    dead: bool,
}

impl<R: Read, W: Write> ChildHandle<R, W> {
    pub fn new(label: impl Into<String>, request_reader: R, response_writer: W) -> Self {
        Self {
            label: label.into(),
            request_reader,
            response_writer,
            accumulator: FrameAccumulator::new(),
            dead: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }
}

/// Polls a fixed set of children's request streams. `request_reader`s must
/// already be in non-blocking mode (e.g. via
/// [`crate::pipes::set_nonblocking`]) — the multiplexer itself never
/// blocks on I/O beyond the caller-supplied `timeout`.
pub struct ParentMultiplexer<R: Read, W: Write> {
    children: Vec<ChildHandle<R, W>>,
}

/// One arrived request, identified by which child sent it.
pub struct ArrivedRequest {
    pub child_index: usize,
    pub message: RequestMessage,
}

impl<R: Read, W: Write> ParentMultiplexer<R, W> {
    pub fn new() -> Self {
        Self { children: Vec::new() }
    }

    pub fn add_child(&mut self, handle: ChildHandle<R, W>) -> usize {
        self.children.push(handle);
        self.children.len() - 1
    }

    pub fn remove_child(&mut self, index: usize) {
        if index < self.children.len() {
            self.children.remove(index);
        }
    }

    pub fn children(&self) -> &[ChildHandle<R, W>] {
        &self.children
    }

    /// Polls every live child's request stream until at least one request
    /// has fully arrived or `timeout` elapses. Requests from different
    /// children may interleave; within one child, requests are strictly
    /// sequential since only one is ever outstanding.
    ///
    /// A child whose stream errors (including a clean close) is marked
    /// dead and skipped on subsequent polls rather than being removed
    /// immediately, so the caller can log/report it before dropping it.
    pub fn poll_once(&mut self, timeout: Duration) -> Vec<ArrivedRequest> {
        let deadline = Instant::now() + timeout;
        let mut arrived = Vec::new();

        loop {
            for (index, child) in self.children.iter_mut().enumerate() {
                if child.dead {
                    continue;
                }
                match child.accumulator.poll(&mut child.request_reader) {
                    Ok(Some(bytes)) => match serde_json::from_slice::<RequestMessage>(&bytes) {
                        Ok(message) => arrived.push(ArrivedRequest { child_index: index, message }),
                        Err(error) => {
                            tracing::warn!(child = %child.label, %error, "malformed request; dropping child");
                            child.dead = true;
                        }
                    },
                    Ok(None) => {}
                    Err(ChannelError::Closed) => {
                        tracing::debug!(child = %child.label, "channel closed by child");
                        child.dead = true;
                    }
                    Err(error) => {
                        tracing::warn!(child = %child.label, %error, "approval channel error; dropping child");
                        child.dead = true;
                    }
                }
            }

            if !arrived.is_empty() || Instant::now() >= deadline || self.children.iter().all(|c| c.dead) {
                return arrived;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Sends a response to the child that raised `request`. A write
    /// failure collapses that child's channel; it does not affect any
    /// other child.
    pub fn respond(&mut self, request: &ArrivedRequest, body: ResponseBody) -> Result<(), ChannelError> {
        let child = &mut self.children[request.child_index];
        let response = ResponseMessage { seq: request.message.seq(), body };
        let result = write_frame(&mut child.response_writer, &response);
        if result.is_err() {
            child.dead = true;
        }
        result
    }
}

impl<R: Read, W: Write> Default for ParentMultiplexer<R, W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PatternConfirmationWire, ResponseBody};
    use std::io::Cursor;
    use toolgate_core::{ApprovalOutcome, GateCategory, ToolCall};

    /// A reader that yields a fixed buffer once, then reports `WouldBlock`
    /// forever — one complete frame delivered atomically, matching a pipe
    /// whose writer wrote it in a single `write_all` (the common case).
    struct OnceThenBlock {
        data: Vec<u8>,
        offset: usize,
    }

    impl Read for OnceThenBlock {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.offset >= self.data.len() {
                return Err(std::io::Error::from(std::io::ErrorKind::WouldBlock));
            }
            let n = (self.data.len() - self.offset).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
            self.offset += n;
            Ok(n)
        }
    }

    fn framed_request(message: &RequestMessage) -> Vec<u8> {
        let mut buf = Vec::new();
        write_frame(&mut buf, message).unwrap();
        buf
    }

    #[test]
    fn poll_once_surfaces_a_request_and_respond_writes_back() {
        let call = ToolCall::new("1", "run_terminal_cmd", r#"{"command":"ls"}"#);
        let request = RequestMessage::ApprovalRequest { seq: 1, tool_call: call, category: GateCategory::Shell };
        let reader = OnceThenBlock { data: framed_request(&request), offset: 0 };
        let writer: Vec<u8> = Vec::new();

        let mut multiplexer = ParentMultiplexer::new();
        multiplexer.add_child(ChildHandle::new("child-a", reader, writer));

        let arrived = multiplexer.poll_once(Duration::from_millis(50));
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].message.seq(), 1);

        multiplexer
            .respond(
                &arrived[0],
                ResponseBody::Approval { outcome: ApprovalOutcome::Allowed, path_identity: None },
            )
            .unwrap();

        let written = &multiplexer.children()[0].response_writer;
        let decoded: ResponseMessage = {
            let mut cursor = Cursor::new(written.clone());
            crate::framing::read_frame(&mut cursor).unwrap()
        };
        assert_eq!(decoded.seq, 1);
    }

    #[test]
    fn poll_once_times_out_with_no_requests() {
        let reader = OnceThenBlock { data: Vec::new(), offset: 0 };
        let writer: Vec<u8> = Vec::new();
        let mut multiplexer = ParentMultiplexer::new();
        multiplexer.add_child(ChildHandle::new("child-a", reader, writer));

        let arrived = multiplexer.poll_once(Duration::from_millis(20));
        assert!(arrived.is_empty());
    }

    #[test]
    fn closed_child_is_marked_dead() {
        let reader = Cursor::new(Vec::<u8>::new());
        let writer: Vec<u8> = Vec::new();
        let mut multiplexer = ParentMultiplexer::new();
        multiplexer.add_child(ChildHandle::new("child-a", reader, writer));

        // Cursor over an empty buffer reads 0 immediately, which the
        // accumulator treats as a clean close.
        let arrived = multiplexer.poll_once(Duration::from_millis(20));
        assert!(arrived.is_empty());
        assert!(multiplexer.children()[0].is_dead());
    }

    #[test]
    fn pattern_confirm_request_round_trips() {
        let pattern = toolgate_core::generate_pattern(
            &ToolCall::new("1", "web_fetch", r#"{"url":"https://api.example.com/v1"}"#),
            true,
        );
        let request = RequestMessage::PatternConfirm { seq: 5, pattern };
        let reader = OnceThenBlock { data: framed_request(&request), offset: 0 };
        let writer: Vec<u8> = Vec::new();
        let mut multiplexer = ParentMultiplexer::new();
        multiplexer.add_child(ChildHandle::new("child-a", reader, writer));

        let arrived = multiplexer.poll_once(Duration::from_millis(50));
        assert_eq!(arrived.len(), 1);
        multiplexer
            .respond(
                &arrived[0],
                ResponseBody::PatternConfirm { confirmation: PatternConfirmationWire::Confirmed },
            )
            .unwrap();
    }
}
