//! Driver error types.

use std::io;

/// A `Result` alias using this crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// An error produced by the TBSP driver.
#[derive(Debug)]
pub enum Error {
    /// The OS socket or BPF handle reported failure on open, bind, filter install, send or
    /// receive. Fatal to the session.
    LinkIo(io::Error),
    /// Ten reset attempts failed to elicit a matching ACK from the device.
    ResetExhausted,
    /// `send_stream`/`recv_stream` (or a tensor/byte operation built on them) was called before a
    /// successful [`reset`](crate::Driver::reset).
    ///
    /// spec.md leaves this case "undefined at the protocol layer"; this driver resolves the
    /// ambiguity by rejecting the call instead of reading or writing sequence counters that have
    /// never been synchronised with the device (see DESIGN.md).
    NotSynced,
    /// A byte slice passed to [`Driver::send_bytes`](crate::Driver::send_bytes) or a tensor
    /// passed to a `send_tensor_*` method is too large to address with a `u32` sequence counter.
    PayloadTooLarge {
        /// The length of the rejected payload, in bytes.
        len: usize,
    },
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::LinkIo(e) => Some(e),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::LinkIo(e) => write!(f, "link I/O error: {e}"),
            Error::ResetExhausted => f.write_str("reset handshake failed after 10 attempts"),
            Error::NotSynced => {
                f.write_str("stream operation attempted before a successful reset")
            }
            Error::PayloadTooLarge { len } => {
                write!(f, "payload of {len} bytes is too large to stream")
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::LinkIo(e)
    }
}
