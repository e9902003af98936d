use super::{Association, FieldMapping, IdGenerator};
use crate::{driver::Row, stmt::Value, Error, Result};

use indexmap::IndexMap;
use std::any::Any;

/// Field name to value, as extracted from an entity instance.
pub type Snapshot = IndexMap<String, Value>;

/// Immutable description of an entity class, built by the
/// [`Registry`](super::Registry).
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub class: String,

    pub table: String,

    pub schema: Option<String>,

    /// Identifier field names, in declaration order
    pub identifiers: Vec<String>,

    pub fields: IndexMap<String, FieldMapping>,

    pub associations: IndexMap<String, Association>,

    pub id_generator: IdGenerator,
}

impl EntityMetadata {
    /// `schema.table` when a schema is set, otherwise the table name.
    pub fn full_table_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.get(name)
    }

    pub fn column(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|field| &field.column[..])
    }

    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifiers.iter().any(|id| id == field)
    }

    pub fn is_composite(&self) -> bool {
        self.identifiers.len() > 1
    }

    /// Returns `true` if inserts omit the identifier and read it back from
    /// the connection.
    pub fn generates_identity(&self) -> bool {
        self.id_generator == IdGenerator::Identity && self.identifiers.len() == 1
    }

    /// Fails with a mapping error if the entity declares no identifier.
    pub fn require_identifiers(&self) -> Result<()> {
        if self.identifiers.is_empty() {
            return Err(Error::mapping(format!(
                "entity `{}` has no identifier fields",
                self.class
            )));
        }
        Ok(())
    }

    pub fn identifier_fields(&self) -> impl Iterator<Item = &FieldMapping> + '_ {
        self.identifiers
            .iter()
            .filter_map(|name| self.fields.get(name))
    }

    /// Reads every mapped field of `entity`.
    pub fn extract(&self, entity: &dyn Any) -> Result<Snapshot> {
        self.fields
            .values()
            .map(|field| Ok((field.name.clone(), field.accessor.get(entity)?)))
            .collect()
    }

    /// Reads the identifier fields of `entity`, in declaration order.
    pub fn identifier_values(&self, entity: &dyn Any) -> Result<Snapshot> {
        self.identifier_fields()
            .map(|field| Ok((field.name.clone(), field.accessor.get(entity)?)))
            .collect()
    }

    /// Writes the columns of `row` onto `entity`.
    ///
    /// Columns with no mapped field are ignored and fields with no column in
    /// the row keep their current value. A null is only written to a
    /// nullable field.
    pub fn hydrate(&self, entity: &mut dyn Any, row: &Row) -> Result<()> {
        for field in self.fields.values() {
            let Some(value) = row.get(&field.column) else {
                continue;
            };

            if value.is_null() && !field.nullable {
                continue;
            }

            let value = field.ty.coerce(value.clone()).map_err(|err| {
                err.context(Error::mapping(format!(
                    "cannot hydrate `{}.{}` from column `{}`",
                    self.class, field.name, field.column
                )))
            })?;

            field.accessor.set(entity, value).map_err(|err| {
                err.context(Error::mapping(format!(
                    "cannot hydrate `{}.{}` from column `{}`",
                    self.class, field.name, field.column
                )))
            })?;
        }

        Ok(())
    }

    /// Writes a single field value onto `entity`.
    pub fn set_field(&self, entity: &mut dyn Any, field: &str, value: Value) -> Result<()> {
        let Some(mapping) = self.fields.get(field) else {
            return Err(Error::mapping(format!(
                "`{}` has no field `{field}`",
                self.class
            )));
        };
        let value = mapping.ty.coerce(value)?;
        mapping.accessor.set(entity, value)
    }
}
