use thiserror::Error;

/// IPC failure kinds. Any of these collapses the channel: the caller must
/// not retry it, only fall back to `NonInteractiveDenied`/`Cancelled`.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("approval channel I/O error: {0}")]
    Io(String),
    #[error("approval channel closed by peer")]
    Closed,
    #[error("response sequence {got} does not match outstanding request {expected}")]
    SequenceMismatch { expected: u64, got: u64 },
    #[error("message of {0} bytes exceeds the channel's size limit")]
    MessageTooLarge(usize),
    #[error("failed to encode approval channel message: {0}")]
    Encode(String),
    #[error("failed to decode approval channel message: {0}")]
    Decode(String),
    #[error("unexpected response kind for the outstanding request")]
    UnexpectedResponseKind,
}

impl From<std::io::Error> for ChannelError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}
