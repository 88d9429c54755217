//! Length-prefixed JSON framing shared by both ends of the channel: a
//! `u32` big-endian byte count followed by that many bytes of JSON.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ChannelError;

/// Generous upper bound on one frame's body. A tool call's JSON arguments
/// and a pretty-printed details box both fit comfortably under this; it
/// exists only to stop a corrupt or hostile length prefix from driving an
/// unbounded allocation.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub(crate) fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), ChannelError> {
    let body = serde_json::to_vec(message).map_err(|error| ChannelError::Encode(error.to_string()))?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(ChannelError::MessageTooLarge(body.len()));
    }
    let len = body.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Blocks until one full frame has arrived, then decodes it.
pub(crate) fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, ChannelError> {
    let mut len_buf = [0u8; 4];
    read_exact_or_closed(reader, &mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ChannelError::MessageTooLarge(len));
    }
    let mut body = vec![0u8; len];
    read_exact_or_closed(reader, &mut body)?;
    serde_json::from_slice(&body).map_err(|error| ChannelError::Decode(error.to_string()))
}

fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ChannelError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => Err(ChannelError::Closed),
        Err(error) => Err(ChannelError::Io(error.to_string())),
    }
}

/// Accumulates one frame across repeated non-blocking reads, for the
/// parent-side multiplexer polling all request streams concurrently with
/// a timeout. A single accumulator is reused across frames; `poll` returns
/// `Ok(None)` when the peer has no data ready yet.
pub(crate) struct FrameAccumulator {
    header: [u8; 4],
    header_filled: usize,
    body: Vec<u8>,
    body_filled: usize,
    expecting_body: bool,
}

impl FrameAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            header: [0u8; 4],
            header_filled: 0,
            body: Vec::new(),
            body_filled: 0,
            expecting_body: false,
        }
    }

    /// Makes as much non-blocking progress as the peer currently allows.
    /// Returns `Ok(Some(bytes))` once a full frame body has arrived,
    /// `Ok(None)` if the peer has nothing more to offer right now, and an
    /// error (including `ChannelError::Closed` on a clean EOF) otherwise.
    pub(crate) fn poll<R: Read>(&mut self, reader: &mut R) -> Result<Option<Vec<u8>>, ChannelError> {
        if !self.expecting_body {
            while self.header_filled < 4 {
                match reader.read(&mut self.header[self.header_filled..]) {
                    Ok(0) => return Err(ChannelError::Closed),
                    Ok(n) => self.header_filled += n,
                    Err(error) if would_block(&error) => return Ok(None),
                    Err(error) => return Err(ChannelError::Io(error.to_string())),
                }
            }
            let len = u32::from_be_bytes(self.header) as usize;
            if len > MAX_FRAME_BYTES {
                return Err(ChannelError::MessageTooLarge(len));
            }
            self.body = vec![0u8; len];
            self.body_filled = 0;
            self.expecting_body = true;
        }

        while self.body_filled < self.body.len() {
            match reader.read(&mut self.body[self.body_filled..]) {
                Ok(0) => return Err(ChannelError::Closed),
                Ok(n) => self.body_filled += n,
                Err(error) if would_block(&error) => return Ok(None),
                Err(error) => return Err(ChannelError::Io(error.to_string())),
            }
        }

        let bytes = std::mem::take(&mut self.body);
        self.header_filled = 0;
        self.body_filled = 0;
        self.expecting_body = false;
        Ok(Some(bytes))
    }
}

fn would_block(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_small_message() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: String = read_frame(&mut cursor).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn read_frame_reports_closed_on_truncated_stream() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let result: Result<String, ChannelError> = read_frame(&mut cursor);
        assert!(matches!(result, Err(ChannelError::Closed)));
    }

    /// A reader that trickles a fixed byte buffer `chunk_size` bytes at a
    /// time, then reports `WouldBlock` (rather than `0`/EOF) once
    /// exhausted — the behavior a real non-blocking pipe exhibits when the
    /// peer has written less than a full frame so far.
    struct Trickle {
        data: Vec<u8>,
        offset: usize,
        chunk_size: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.offset >= self.data.len() {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            let end = (self.offset + self.chunk_size).min(self.data.len()).min(self.offset + buf.len());
            let n = end - self.offset;
            buf[..n].copy_from_slice(&self.data[self.offset..end]);
            self.offset = end;
            Ok(n)
        }
    }

    #[test]
    fn accumulator_assembles_a_frame_delivered_in_pieces() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &"chunked").unwrap();
        let mut reader = Trickle { data: buf, offset: 0, chunk_size: 3 };

        let mut accumulator = FrameAccumulator::new();
        let mut result = None;
        for _ in 0..100 {
            match accumulator.poll(&mut reader) {
                Ok(Some(bytes)) => {
                    result = Some(bytes);
                    break;
                }
                Ok(None) => continue,
                Err(error) => panic!("unexpected error: {error}"),
            }
        }
        let bytes = result.expect("frame should be complete after all bytes delivered");
        let decoded: String = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, "chunked");
    }
}
