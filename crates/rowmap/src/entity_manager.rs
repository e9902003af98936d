mod builder;
pub use builder::Builder;

use crate::{
    session::Session,
    unit_of_work::{EntityState, IdentityKey, UnitOfWork},
    Entity, Handle, Query, Reference, Repository,
};

use indexmap::IndexMap;
use rowmap_core::{
    driver::Row,
    schema::{Registry, SchemaValidator},
    stmt::Identifier,
    EntityMetadata, Error, Result,
};
use rowmap_sql::{stmt::Select, ParseCache};
use std::sync::Arc;

/// Loads, tracks and writes entities through one connection.
///
/// An entity manager owns one [`UnitOfWork`]: entities returned by
/// [`find`](Self::find) are registered in its identity map, and changes made
/// to them through their [`Handle`] are written on [`flush`](Self::flush).
///
/// ```no_run
/// # use rowmap::{EntityManager, Connection};
/// # fn connect() -> Box<dyn Connection> { unimplemented!() }
/// # #[derive(Debug, Default)] struct User { id: Option<i64>, username: String }
/// # impl rowmap::Entity for User {
/// #     const NAME: &'static str = "User";
/// #     fn mapping() -> rowmap::Mapping { rowmap::Mapping::entity() }
/// # }
/// let mut em = EntityManager::builder()
///     .register::<User>()
///     .build(connect())?;
///
/// if let Some(user) = em.find::<User>(1)? {
///     user.borrow_mut().username = "alice".to_string();
///     em.flush()?;
/// }
/// # Ok::<_, rowmap::Error>(())
/// ```
#[derive(Debug)]
pub struct EntityManager {
    registry: Registry,
    parse_cache: ParseCache,
    pub(crate) session: Session,
    unit_of_work: UnitOfWork,
}

impl EntityManager {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Metadata of a registered entity type.
    pub fn metadata<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        if !self.registry.is_registered(T::NAME) {
            return Err(Error::validation(format!(
                "`{}` is not a registered entity type",
                T::NAME
            )));
        }

        self.registry.describe(T::NAME)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn parse_cache(&self) -> &ParseCache {
        &self.parse_cache
    }

    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.unit_of_work
    }

    /// Loads an entity by identifier.
    ///
    /// Returns the instance already in the identity map when there is one.
    /// Otherwise the row is selected by every identifier column and the
    /// hydrated instance is registered as managed.
    pub fn find<T: Entity>(&mut self, id: impl Into<Identifier>) -> Result<Option<Handle<T>>> {
        let metadata = self.metadata::<T>()?;
        let key = IdentityKey::new(&metadata, &id.into())?;

        if let Some(entity) = self.unit_of_work.try_get(&key) {
            tracing::trace!(key = %key, "identity map hit");
            return entity.downcast().map(Some);
        }

        let Some(row) = self.load_row(&metadata, &key)? else {
            return Ok(None);
        };

        let handle = Handle::new(T::default());
        metadata.hydrate(&mut *handle.borrow_mut(), &row)?;
        let snapshot = metadata.extract(&*handle.borrow())?;

        self.unit_of_work
            .register_managed(handle.erase(), metadata, key, snapshot);

        Ok(Some(handle))
    }

    fn load_row(&mut self, metadata: &EntityMetadata, key: &IdentityKey) -> Result<Option<Row>> {
        let columns = metadata.fields.values().map(|field| &field.column[..]);
        let stmt =
            Select::columns(metadata.full_table_name(), columns).filter(key.filter(metadata));

        let rows = self.session.exec_query(&stmt.into())?;
        Ok(rows.into_vec().into_iter().next())
    }

    /// Schedules `entity` for insert, or cancels its pending delete.
    pub fn persist<T: Entity>(&mut self, entity: &Handle<T>) -> Result<()> {
        let metadata = self.metadata::<T>()?;
        metadata.require_identifiers()?;

        self.unit_of_work.persist(entity.erase(), metadata);
        Ok(())
    }

    /// Schedules `entity` for delete. A pending insert is cancelled instead.
    pub fn remove<T: Entity>(&mut self, entity: &Handle<T>) -> Result<()> {
        self.metadata::<T>()?;
        self.unit_of_work.remove(entity.oid())
    }

    /// Writes every pending change.
    pub fn flush(&mut self) -> Result<()> {
        self.unit_of_work
            .commit(&mut self.session)
            .map_err(|err| err.context(Error::flush_failed()))
    }

    /// Runs `f` inside a transaction and flushes before committing.
    ///
    /// If `f`, the flush or the commit fails, the transaction is rolled back,
    /// the unit of work is restored to its state before the call, and the
    /// error is returned unchanged. Calls may nest; only the outermost one
    /// commits.
    pub fn transactional<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let saved = self.unit_of_work.clone();

        self.session.begin()?;

        let result = f(self).and_then(|ret| {
            self.flush()?;
            Ok(ret)
        });

        match result {
            Ok(ret) => match self.session.commit() {
                Ok(()) => Ok(ret),
                Err(err) => {
                    self.unit_of_work = saved;
                    Err(err)
                }
            },
            Err(err) => {
                if let Err(rollback) = self.session.rollback() {
                    tracing::warn!(error = %rollback, "rollback of transactional block failed");
                }
                self.unit_of_work = saved;
                Err(err)
            }
        }
    }

    /// Parses and compiles an OQL query. Parses are served from the parse
    /// cache when the same text was seen before.
    pub fn create_query(&mut self, oql: &str) -> Result<Query<'_>> {
        let ast = self.parse_cache.parse(oql, &self.registry)?;
        let compiled = rowmap_sql::Compiler::new(&self.registry).compile(&ast)?;

        Ok(Query::new(self, ast.from.clone(), compiled))
    }

    /// The managed instance for `id` if there is one, otherwise an unloaded
    /// reference. Performs no I/O.
    pub fn get_reference<T: Entity>(&self, id: impl Into<Identifier>) -> Result<Reference<T>> {
        let metadata = self.metadata::<T>()?;
        let id = id.into();
        let key = IdentityKey::new(&metadata, &id)?;

        match self.unit_of_work.try_get(&key) {
            Some(entity) => Ok(Reference::Loaded(entity.downcast()?)),
            None => Ok(Reference::Unloaded(id)),
        }
    }

    /// Reloads every mapped field of `entity` from the database and
    /// registers it as managed with a fresh snapshot.
    ///
    /// If the row is gone the entity is detached and an entity-not-found
    /// error is returned. Any other failure leaves tracking unchanged.
    pub fn refresh<T: Entity>(&mut self, entity: &Handle<T>) -> Result<()> {
        let metadata = self.metadata::<T>()?;
        let erased = entity.erase();

        let ids = metadata.identifier_values(&*erased.borrow()?)?;
        let key = IdentityKey::from_snapshot(&metadata, &ids)
            .map_err(|err| err.context(Error::state(format!("cannot refresh {}", T::NAME))))?;

        let Some(row) = self.load_row(&metadata, &key)? else {
            self.unit_of_work.detach(entity.oid());
            return Err(Error::entity_not_found(T::NAME, key.identifier()));
        };

        let mut fresh = T::default();
        metadata.hydrate(&mut fresh, &row)?;

        let snapshot = {
            let mut target = erased.borrow_mut()?;
            for field in metadata.fields.values() {
                field.accessor.set(&mut *target, field.accessor.get(&fresh)?)?;
            }
            metadata.extract(&*target)?
        };

        self.unit_of_work.detach(entity.oid());
        self.unit_of_work.register_managed(erased, metadata, key, snapshot);

        Ok(())
    }

    /// Returns `true` if `entity` is tracked and not scheduled for removal.
    pub fn contains<T: Entity>(&self, entity: &Handle<T>) -> bool {
        self.unit_of_work.contains(entity.oid())
    }

    pub fn state<T: Entity>(&self, entity: &Handle<T>) -> EntityState {
        self.unit_of_work.state(entity.oid())
    }

    /// Stops tracking `entity`. Pending changes to it are dropped.
    pub fn detach<T: Entity>(&mut self, entity: &Handle<T>) {
        self.unit_of_work.detach(entity.oid());
    }

    /// Stops tracking every entity.
    pub fn clear(&mut self) {
        self.unit_of_work.clear();
    }

    pub fn repository<T: Entity>(&mut self) -> Repository<'_, T> {
        Repository::new(self)
    }

    /// Runs the schema validator over every registered class.
    pub fn validate_schema(&self) -> IndexMap<String, Vec<String>> {
        SchemaValidator::new(&self.registry).validate_all()
    }

    pub fn clear_metadata_cache(&self) {
        self.registry.invalidate_all();
    }

    pub fn clear_query_cache(&self) {
        self.parse_cache.clear();
    }
}
