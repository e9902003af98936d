use crate::{stmt::Value, Error, Result};

use std::{any::Any, fmt, sync::Arc};

type Getter = dyn Fn(&dyn Any) -> Result<Value> + Send + Sync;
type Setter = dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync;

/// Reads and writes one mapped field of an entity.
///
/// Built once per field when the mapping is declared and stored on the
/// entity metadata. The entity is passed type-erased; applying the accessor
/// to an instance of another type is a mapping error.
#[derive(Clone)]
pub struct Accessor {
    get: Arc<Getter>,
    set: Arc<Setter>,
}

impl Accessor {
    pub fn new<T: Any>(get: fn(&T) -> Value, set: fn(&mut T, Value) -> Result<()>) -> Self {
        Self {
            get: Arc::new(move |entity: &dyn Any| -> Result<Value> {
                let entity = entity.downcast_ref::<T>().ok_or_else(wrong_type::<T>)?;
                Ok(get(entity))
            }),
            set: Arc::new(move |entity: &mut dyn Any, value: Value| -> Result<()> {
                let entity = entity.downcast_mut::<T>().ok_or_else(wrong_type::<T>)?;
                set(entity, value)
            }),
        }
    }

    pub fn get(&self, entity: &dyn Any) -> Result<Value> {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut dyn Any, value: Value) -> Result<()> {
        (self.set)(entity, value)
    }
}

fn wrong_type<T>() -> Error {
    Error::mapping(format!(
        "accessor for `{}` applied to an instance of another type",
        std::any::type_name::<T>()
    ))
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor")
    }
}

/// Builds an [`Accessor`] for a struct field whose type converts to and
/// from [`Value`].
///
/// ```
/// # use rowmap_core::accessor;
/// #[derive(Default)]
/// struct User {
///     username: String,
/// }
///
/// let accessor = accessor!(User, username);
/// let mut user = User::default();
/// accessor.set(&mut user, "alice".into()).unwrap();
/// assert_eq!(user.username, "alice");
/// ```
#[macro_export]
macro_rules! accessor {
    ($ty:ty, $field:ident) => {
        $crate::schema::Accessor::new::<$ty>(
            |entity| $crate::stmt::Value::from(::core::clone::Clone::clone(&entity.$field)),
            |entity, value| {
                entity.$field = ::core::convert::TryFrom::try_from(value)?;
                Ok(())
            },
        )
    };
}
