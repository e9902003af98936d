use super::Error;

/// Error when the row backing an entity no longer exists.
#[derive(Debug)]
pub(super) struct EntityNotFoundError {
    class: Box<str>,
    identifier: Box<str>,
}

impl std::error::Error for EntityNotFoundError {}

impl core::fmt::Display for EntityNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "entity not found: {} with identifier {}",
            self.class, self.identifier
        )
    }
}

impl Error {
    /// Creates an entity not found error.
    ///
    /// Raised when resolving a lazy reference or refreshing an entity whose
    /// row has disappeared.
    pub fn entity_not_found(class: impl Into<String>, identifier: impl ToString) -> Error {
        Error::from(super::ErrorKind::EntityNotFound(EntityNotFoundError {
            class: class.into().into(),
            identifier: identifier.to_string().into(),
        }))
    }

    /// Returns `true` if this error is an entity not found error.
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::EntityNotFound(_))
    }
}
