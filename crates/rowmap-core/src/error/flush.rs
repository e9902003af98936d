use super::Error;

/// Error raised by `flush()`. The failure that aborted the flush is kept as
/// the cause.
#[derive(Debug)]
pub(super) struct FlushError;

impl std::error::Error for FlushError {}

impl core::fmt::Display for FlushError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("flush failed")
    }
}

impl Error {
    /// Creates a flush error. Use with [`Error::context`] so the underlying
    /// failure remains attached.
    pub fn flush_failed() -> Error {
        Error::from(super::ErrorKind::Flush(FlushError))
    }

    /// Returns `true` if this error is a flush error.
    pub fn is_flush(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Flush(_))
    }
}
