use super::Error;

/// Error when an OQL query is malformed, references something that does
/// not exist, or returns a result of the wrong shape.
#[derive(Debug)]
pub(super) struct QueryError {
    message: Box<str>,
    fragment: Option<Box<str>>,
}

impl std::error::Error for QueryError {}

impl core::fmt::Display for QueryError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid query: {}", self.message)?;
        if let Some(ref fragment) = self.fragment {
            write!(f, " (near `{}`)", fragment)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a query error pointing at the offending fragment of the
    /// query text.
    pub fn query(message: impl Into<String>, fragment: impl Into<String>) -> Error {
        let fragment = fragment.into();
        Error::from(super::ErrorKind::Query(QueryError {
            message: message.into().into(),
            fragment: (!fragment.is_empty()).then(|| fragment.into()),
        }))
    }

    /// Returns `true` if this error is a query error.
    pub fn is_query(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Query(_))
    }
}
