use rowmap_core::{schema::Mapping, Error, Result};

use std::{
    any::Any,
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

/// A type mapped to a table.
///
/// `NAME` is the class name the type is registered under. It is used in OQL
/// (`FROM User u`), in association targets and in error messages.
pub trait Entity: Any + Default + fmt::Debug {
    const NAME: &'static str;

    fn mapping() -> Mapping;
}

/// Opaque identity of one entity instance.
///
/// Assigned when a [`Handle`] is created and never reused, so two handles
/// compare equal only when they share the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(u64);

impl Oid {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to an entity instance.
///
/// The entity manager and the caller hold clones of the same handle, which
/// is how changes made by the caller become visible to change tracking.
pub struct Handle<T> {
    oid: Oid,
    cell: Rc<RefCell<T>>,
}

impl<T: Entity> Handle<T> {
    pub fn new(entity: T) -> Self {
        Self {
            oid: Oid::next(),
            cell: Rc::new(RefCell::new(entity)),
        }
    }

    pub(crate) fn erase(&self) -> EntityRef {
        EntityRef {
            oid: self.oid,
            class: T::NAME,
            cell: self.cell.clone(),
            typed: self.cell.clone(),
        }
    }
}

impl<T> Handle<T> {
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// # Panics
    ///
    /// Panics if the entity is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    /// # Panics
    ///
    /// Panics if the entity is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }

    /// Returns `true` if both handles point to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            oid: self.oid,
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(entity) => f
                .debug_struct("Handle")
                .field("oid", &self.oid)
                .field("entity", &*entity)
                .finish(),
            Err(_) => f
                .debug_struct("Handle")
                .field("oid", &self.oid)
                .field("entity", &"<borrowed>")
                .finish(),
        }
    }
}

/// A type-erased [`Handle`], as tracked by the unit of work.
#[derive(Clone)]
pub(crate) struct EntityRef {
    pub(crate) oid: Oid,
    pub(crate) class: &'static str,
    cell: Rc<RefCell<dyn Any>>,
    typed: Rc<dyn Any>,
}

impl EntityRef {
    pub(crate) fn borrow(&self) -> Result<Ref<'_, dyn Any>> {
        self.cell
            .try_borrow()
            .map_err(|_| Error::state(format!("{} {} is mutably borrowed", self.class, self.oid)))
    }

    pub(crate) fn borrow_mut(&self) -> Result<RefMut<'_, dyn Any>> {
        self.cell
            .try_borrow_mut()
            .map_err(|_| Error::state(format!("{} {} is already borrowed", self.class, self.oid)))
    }

    pub(crate) fn downcast<T: Entity>(&self) -> Result<Handle<T>> {
        match self.typed.clone().downcast::<RefCell<T>>() {
            Ok(cell) => Ok(Handle {
                oid: self.oid,
                cell,
            }),
            Err(_) => Err(Error::mapping(format!(
                "{} {} is not an instance of `{}`",
                self.class,
                self.oid,
                T::NAME
            ))),
        }
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("oid", &self.oid)
            .field("class", &self.class)
            .finish()
    }
}
