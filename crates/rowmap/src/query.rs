use crate::{Entity, EntityManager};

use indexmap::IndexMap;
use rowmap_core::{driver::Rows, stmt::Value, Error, Result};
use rowmap_sql::CompiledQuery;

/// A compiled OQL query bound to the entity manager that created it.
///
/// Parameters are bound by name and handed to the driver in the order their
/// placeholders appear in the SQL, whatever order they were set in.
#[derive(Debug)]
pub struct Query<'a> {
    em: &'a mut EntityManager,

    /// Class named in the `FROM` clause
    root: String,

    compiled: CompiledQuery,

    params: IndexMap<String, Value>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(em: &'a mut EntityManager, root: String, compiled: CompiledQuery) -> Self {
        Self {
            em,
            root,
            compiled,
            params: IndexMap::new(),
        }
    }

    /// Binds a named parameter. A leading `:` in `name` is ignored.
    pub fn set_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        let name = name.strip_prefix(':').unwrap_or(name);
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.compiled.sql
    }

    /// Parameter values in placeholder order.
    pub fn parameters(&self) -> Result<Vec<Value>> {
        self.compiled.bind(&self.params)
    }

    /// Runs the query and returns the raw rows.
    pub fn get_rows(&mut self) -> Result<Rows> {
        let params = self.parameters()?;

        self.em
            .session
            .query(&self.compiled.sql, &params)
            .map_err(|err| {
                err.context(Error::query("query execution failed", &self.compiled.sql))
            })
    }

    /// Hydrates one `T` per row.
    ///
    /// Results are not registered with the unit of work; use
    /// [`EntityManager::find`] for managed instances.
    pub fn get_result<T: Entity>(&mut self) -> Result<Vec<T>> {
        let metadata = self.em.metadata::<T>()?;

        if metadata.class != self.root {
            return Err(Error::query(
                format!("query selects from `{}`, not `{}`", self.root, T::NAME),
                &self.compiled.sql,
            ));
        }

        let rows = self.get_rows()?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entity = T::default();
            metadata.hydrate(&mut entity, row)?;
            entities.push(entity);
        }

        Ok(entities)
    }

    /// Like [`get_result`](Self::get_result), but fails if more than one
    /// row comes back.
    pub fn get_single_result<T: Entity>(&mut self) -> Result<Option<T>> {
        let mut entities = self.get_result::<T>()?;

        if entities.len() > 1 {
            return Err(Error::query(
                format!("expected at most one result, got {}", entities.len()),
                &self.compiled.sql,
            ));
        }

        Ok(entities.pop())
    }

    /// First column of the only row, for aggregate projections. An empty
    /// result yields [`Value::Null`].
    pub fn get_single_scalar_result(&mut self) -> Result<Value> {
        let rows = self.get_rows()?;

        match rows.len() {
            0 => Ok(Value::Null),
            1 => Ok(rows
                .first()
                .and_then(|row| row.first())
                .cloned()
                .unwrap_or_default()),
            n => Err(Error::query(
                format!("expected a single row, got {n}"),
                &self.compiled.sql,
            )),
        }
    }
}
