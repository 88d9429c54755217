//! Unix pipe plumbing for spawning a subagent with an approval channel
//! wired in. Pipes are created before spawning; both endpoints dup/close
//! the appropriate ends; a cleanup helper closes both ends on setup
//! failure.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

/// Read end of a unix pipe.
pub struct PipeReader(File);

/// Write end of a unix pipe.
pub struct PipeWriter(File);

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl AsRawFd for PipeReader {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

impl AsRawFd for PipeWriter {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

struct PipePair {
    read_end: PipeReader,
    write_end: PipeWriter,
}

fn create_pipe() -> io::Result<PipePair> {
    let mut fds = [0i32; 2];
    let result = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(PipePair {
        read_end: PipeReader(unsafe { File::from_raw_fd(fds[0]) }),
        write_end: PipeWriter(unsafe { File::from_raw_fd(fds[1]) }),
    })
}

/// Both ends of both directions for one child: the child keeps
/// `child_request_write`/`child_response_read`, the parent keeps
/// `parent_request_read`/`parent_response_write`. Drop closes whichever
/// ends a side still owns, which also serves as cleanup on setup failure:
/// `create_channel_pipes` itself never leaks a half-created pipe, since the
/// first pipe is dropped, closing both its fds, if the second `pipe()`
/// call fails.
pub struct ChannelPipes {
    pub child_request_write: PipeWriter,
    pub child_response_read: PipeReader,
    pub parent_request_read: PipeReader,
    pub parent_response_write: PipeWriter,
}

pub fn create_channel_pipes() -> io::Result<ChannelPipes> {
    let request = create_pipe()?;
    let response = create_pipe()?;
    Ok(ChannelPipes {
        child_request_write: request.write_end,
        parent_request_read: request.read_end,
        parent_response_write: response.write_end,
        child_response_read: response.read_end,
    })
}

/// Puts `fd` into non-blocking mode, for the parent's request-read end so
/// [`crate::parent::ParentMultiplexer`] can poll it without blocking on a
/// quiet child.
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_round_trips_bytes() {
        let mut pipes = create_channel_pipes().unwrap();
        pipes.child_request_write.write_all(b"hello").unwrap();
        pipes.child_request_write.flush().unwrap();
        let mut buf = [0u8; 5];
        pipes.parent_request_read.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn nonblocking_read_end_reports_would_block_when_empty() {
        let pipes = create_channel_pipes().unwrap();
        set_nonblocking(pipes.parent_request_read.as_raw_fd()).unwrap();
        let mut reader = pipes.parent_request_read;
        let mut buf = [0u8; 1];
        let error = reader.read(&mut buf).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::WouldBlock);
    }
}
