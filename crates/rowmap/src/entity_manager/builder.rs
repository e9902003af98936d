use super::EntityManager;
use crate::{session::Session, unit_of_work::UnitOfWork, Entity};

use rowmap_core::{
    driver::{Connection, QueryLogger},
    schema::{Mapping, Registry},
    Error, Result,
};
use rowmap_sql::ParseCache;

use std::{any::TypeId, fmt, rc::Rc};

/// Configures and builds an [`EntityManager`].
pub struct Builder {
    /// Registered entity classes and their mapping functions
    entities: Vec<Registration>,

    metadata_cache: bool,

    query_cache: Option<ParseCache>,

    query_logger: Option<Rc<dyn QueryLogger>>,
}

struct Registration {
    class: &'static str,
    ty: TypeId,
    mapping: fn() -> Mapping,
}

impl Builder {
    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.entities.push(Registration {
            class: T::NAME,
            ty: TypeId::of::<T>(),
            mapping: T::mapping,
        });
        self
    }

    /// Memoize entity metadata per class. On by default.
    pub fn metadata_cache(&mut self, enabled: bool) -> &mut Self {
        self.metadata_cache = enabled;
        self
    }

    /// Use `cache` for parsed queries instead of a private one. The caller
    /// keeps a handle to the same cache.
    pub fn query_cache(&mut self, cache: ParseCache) -> &mut Self {
        self.query_cache = Some(cache);
        self
    }

    pub fn query_logger(&mut self, logger: impl QueryLogger + 'static) -> &mut Self {
        self.query_logger = Some(Rc::new(logger));
        self
    }

    pub fn build(&mut self, connection: impl Connection + 'static) -> Result<EntityManager> {
        let mut registry = Registry::new();
        registry.set_memoize(self.metadata_cache);

        for (i, entity) in self.entities.iter().enumerate() {
            let earlier = self.entities[..i]
                .iter()
                .find(|other| other.class == entity.class);

            match earlier {
                Some(other) if other.ty != entity.ty => {
                    return Err(Error::mapping(format!(
                        "two types are registered under the class name `{}`",
                        entity.class
                    )));
                }
                Some(_) => {}
                None => registry.register(entity.class, entity.mapping),
            }
        }

        tracing::debug!(
            entities = self.entities.len(),
            metadata_cache = self.metadata_cache,
            "building entity manager"
        );

        Ok(EntityManager {
            registry,
            parse_cache: self.query_cache.clone().unwrap_or_default(),
            session: Session::new(Box::new(connection), self.query_logger.clone()),
            unit_of_work: UnitOfWork::new(),
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            entities: vec![],
            metadata_cache: true,
            query_cache: None,
            query_logger: None,
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field(
                "entities",
                &self.entities.iter().map(|entity| entity.class).collect::<Vec<_>>(),
            )
            .field("metadata_cache", &self.metadata_cache)
            .field("query_cache", &self.query_cache)
            .field("query_logger", &self.query_logger.is_some())
            .finish()
    }
}
