use crate::{Entity, EntityManager, Handle};

use indexmap::IndexMap;
use rowmap_core::{
    driver::Rows,
    stmt::{Identifier, Value},
    EntityMetadata, Error, Result,
};
use rowmap_sql::stmt::{Aggregate, Direction, Filter, Select};
use std::marker::PhantomData;

/// Largest page [`Repository::find_paginated`] accepts.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Field-name equality conditions, combined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    fields: IndexMap<String, Value>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<V: Into<Value>, const N: usize> From<[(&str, V); N]> for Criteria {
    fn from(fields: [(&str, V); N]) -> Self {
        fields.into_iter().collect()
    }
}

/// One page of results from [`Repository::find_paginated`].
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Rows matching the criteria across all pages
    pub total: u64,

    /// 1-based page number
    pub page: u64,

    pub page_size: u64,

    pub total_pages: u64,
}

/// Criteria-based lookups for one entity type.
///
/// Apart from [`find`](Self::find), results are hydrated without being
/// registered with the unit of work.
#[derive(Debug)]
pub struct Repository<'a, T> {
    em: &'a mut EntityManager,
    _p: PhantomData<T>,
}

impl<'a, T: Entity> Repository<'a, T> {
    pub(crate) fn new(em: &'a mut EntityManager) -> Self {
        Self {
            em,
            _p: PhantomData,
        }
    }

    pub fn find(&mut self, id: impl Into<Identifier>) -> Result<Option<Handle<T>>> {
        self.em.find(id)
    }

    /// Managed instances for each id that matches a row. Ids without a row
    /// are skipped.
    pub fn find_by_ids<I: Into<Identifier>>(
        &mut self,
        ids: impl IntoIterator<Item = I>,
    ) -> Result<Vec<Handle<T>>> {
        let ids: Vec<Identifier> = ids.into_iter().map(Into::into).collect();

        if ids.is_empty() {
            return Err(Error::validation(format!(
                "no identifiers given to look up `{}`",
                T::NAME
            )));
        }

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(handle) = self.em.find(id)? {
                found.push(handle);
            }
        }

        Ok(found)
    }

    pub fn find_all(&mut self) -> Result<Vec<T>> {
        self.find_by(&Criteria::new(), &[], None, None)
    }

    pub fn find_by(
        &mut self,
        criteria: &Criteria,
        order_by: &[(&str, Direction)],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<T>> {
        let metadata = self.em.metadata::<T>()?;

        let columns = metadata.fields.values().map(|field| &field.column[..]);
        let mut stmt = Select::columns(metadata.full_table_name(), columns)
            .filter(filter(&metadata, criteria)?)
            .limit(limit)
            .offset(offset);

        for (field, direction) in order_by {
            stmt = stmt.order_by(column(&metadata, field)?, *direction);
        }

        let rows = self.select(stmt)?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entity = T::default();
            metadata.hydrate(&mut entity, row)?;
            entities.push(entity);
        }

        Ok(entities)
    }

    pub fn find_one_by(&mut self, criteria: &Criteria) -> Result<Option<T>> {
        let mut entities = self.find_by(criteria, &[], Some(1), None)?;
        Ok(entities.pop())
    }

    /// Page `page` (starting at 1) of `page_size` results, together with
    /// the total number of matching rows.
    pub fn find_paginated(
        &mut self,
        page: u64,
        page_size: u64,
        criteria: &Criteria,
        order_by: &[(&str, Direction)],
    ) -> Result<Page<T>> {
        if page == 0 {
            return Err(Error::validation("page numbers start at 1"));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let offset = (page - 1).saturating_mul(page_size);
        let items = self.find_by(criteria, order_by, Some(page_size), Some(offset))?;
        let total = self.count(criteria)?;

        Ok(Page {
            items,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    pub fn count(&mut self, criteria: &Criteria) -> Result<u64> {
        let metadata = self.em.metadata::<T>()?;
        let stmt = Select::count(metadata.full_table_name()).filter(filter(&metadata, criteria)?);

        let rows = self.select(stmt)?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::I64(0));

        to_count(&count).ok_or_else(|| Error::type_conversion(count, "u64"))
    }

    pub fn exists(&mut self, criteria: &Criteria) -> Result<bool> {
        let metadata = self.em.metadata::<T>()?;
        metadata.require_identifiers()?;

        let columns = metadata.identifier_fields().map(|field| &field.column[..]);
        let stmt = Select::columns(metadata.full_table_name(), columns)
            .filter(filter(&metadata, criteria)?)
            .limit(Some(1));

        Ok(!self.select(stmt)?.is_empty())
    }

    /// Applies `aggregate` to `field` over the rows matching `criteria`.
    ///
    /// `field` may be `*` for `COUNT`. An empty result yields
    /// [`Value::Null`].
    pub fn aggregate(
        &mut self,
        aggregate: Aggregate,
        field: &str,
        criteria: &Criteria,
    ) -> Result<Value> {
        let metadata = self.em.metadata::<T>()?;

        let target = match field {
            "*" if aggregate == Aggregate::Count => "*",
            "*" => {
                return Err(Error::validation(format!(
                    "{aggregate} needs a field, not `*`"
                )))
            }
            field => column(&metadata, field)?,
        };

        let stmt = Select::aggregate(metadata.full_table_name(), aggregate, target)
            .filter(filter(&metadata, criteria)?);

        let rows = self.select(stmt)?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or_default())
    }

    /// Runs an OQL query selecting from `T` with the given named parameters.
    pub fn execute_query<K, V>(
        &mut self,
        oql: &str,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<T>>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        if oql.trim().is_empty() {
            return Err(Error::validation("query text cannot be empty"));
        }

        let mut query = self.em.create_query(oql)?;
        for (name, value) in params {
            query = query.set_parameter(name.as_ref(), value);
        }

        query.get_result::<T>()
    }

    fn select(&mut self, stmt: Select) -> Result<Rows> {
        self.em.session.exec_query(&stmt.into())
    }
}

fn column<'m>(metadata: &'m EntityMetadata, field: &str) -> Result<&'m str> {
    metadata.column(field).ok_or_else(|| {
        Error::validation(format!("`{}` has no field `{field}`", metadata.class))
    })
}

fn filter(metadata: &EntityMetadata, criteria: &Criteria) -> Result<Filter> {
    criteria
        .fields
        .iter()
        .map(|(field, value)| Ok((column(metadata, field)?, value.clone())))
        .collect()
}

fn to_count(value: &Value) -> Option<u64> {
    match value {
        Value::I64(n) => u64::try_from(*n).ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
