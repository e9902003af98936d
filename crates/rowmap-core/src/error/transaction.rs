use super::Error;

/// Error when beginning, committing or rolling back a transaction fails.
///
/// Usually attached with [`Error::context`] on top of the driver failure
/// that caused it.
#[derive(Debug)]
pub(super) struct TransactionError {
    message: Box<str>,
}

impl std::error::Error for TransactionError {}

impl core::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "transaction error: {}", self.message)
    }
}

impl Error {
    /// Creates a transaction error.
    pub fn transaction(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Transaction(TransactionError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a transaction error.
    pub fn is_transaction(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Transaction(_))
    }
}
