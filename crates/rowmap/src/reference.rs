use crate::{Entity, EntityManager, Handle};

use rowmap_core::{stmt::Identifier, Error, Result};

/// A related entity that may not have been loaded yet.
///
/// An unloaded reference only knows its identifier. The first
/// [`resolve`](Self::resolve) loads the entity through
/// [`EntityManager::find`] and keeps it, so later calls do no I/O.
#[derive(Debug)]
pub enum Reference<T> {
    Loaded(Handle<T>),
    Unloaded(Identifier),
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loaded(handle) => Self::Loaded(handle.clone()),
            Self::Unloaded(id) => Self::Unloaded(id.clone()),
        }
    }
}

impl<T: Entity> Reference<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded entity, if any.
    pub fn get(&self) -> Option<&Handle<T>> {
        match self {
            Self::Loaded(handle) => Some(handle),
            Self::Unloaded(_) => None,
        }
    }

    /// Identifier of an unloaded reference.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Self::Loaded(_) => None,
            Self::Unloaded(id) => Some(id),
        }
    }

    /// Loads the entity on first use.
    ///
    /// Fails with an entity-not-found error if the row no longer exists;
    /// the reference stays unloaded in that case.
    pub fn resolve(&mut self, em: &mut EntityManager) -> Result<Handle<T>> {
        let id = match self {
            Self::Loaded(handle) => return Ok(handle.clone()),
            Self::Unloaded(id) => id,
        };

        let Some(handle) = em.find::<T>(id.clone())? else {
            return Err(Error::entity_not_found(T::NAME, &*id));
        };

        *self = Self::Loaded(handle.clone());
        Ok(handle)
    }
}
