use super::Error;

/// Error when an operation is not valid for the entity's lifecycle state,
/// e.g. removing an entity the unit of work does not track.
#[derive(Debug)]
pub(super) struct StateError {
    message: Box<str>,
}

impl std::error::Error for StateError {}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid entity state: {}", self.message)
    }
}

impl Error {
    /// Creates a lifecycle state error.
    pub fn state(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::State(StateError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a lifecycle state error.
    pub fn is_state(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::State(_))
    }
}
