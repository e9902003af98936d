use rowmap_core::{
    schema::Snapshot,
    stmt::{Identifier, Value},
    EntityMetadata, Error, Result,
};
use rowmap_sql::stmt::Filter;

use std::fmt;

/// Key of the identity map: the entity class plus its identifier values.
///
/// Fields are kept sorted by name so the order a composite identifier was
/// written in never affects equality or hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    class: String,
    fields: Vec<(String, Value)>,
}

impl IdentityKey {
    /// Validates `id` against the identifier fields of `metadata`.
    ///
    /// A scalar is accepted for single-column keys only. A map must name
    /// every identifier field and nothing else. Values are coerced to the
    /// field type so `"7"` and `7` address the same integer key.
    pub fn new(metadata: &EntityMetadata, id: &Identifier) -> Result<Self> {
        metadata.require_identifiers()?;

        let mut fields = vec![];

        match id {
            Identifier::Scalar(value) => {
                if metadata.is_composite() {
                    return Err(Error::validation(format!(
                        "`{}` has a composite identifier ({}); pass a map of field values",
                        metadata.class,
                        metadata.identifiers.join(", ")
                    )));
                }

                let name = &metadata.identifiers[0];
                fields.push((name.clone(), coerce(metadata, name, value)?));
            }
            Identifier::Composite(values) => {
                if let Some(extra) = values.keys().find(|name| !metadata.is_identifier(name)) {
                    return Err(Error::validation(format!(
                        "`{extra}` is not an identifier field of `{}`",
                        metadata.class
                    )));
                }

                for name in &metadata.identifiers {
                    let Some(value) = values.get(name) else {
                        return Err(Error::validation(format!(
                            "missing value for identifier field `{name}` of `{}`",
                            metadata.class
                        )));
                    };
                    fields.push((name.clone(), coerce(metadata, name, value)?));
                }
            }
        }

        Ok(Self::sorted(&metadata.class, fields))
    }

    /// Builds the key from field values read off an entity instance.
    pub fn from_snapshot(metadata: &EntityMetadata, snapshot: &Snapshot) -> Result<Self> {
        metadata.require_identifiers()?;

        let mut fields = vec![];
        for name in &metadata.identifiers {
            let value = snapshot.get(name).cloned().unwrap_or_default();
            fields.push((name.clone(), coerce(metadata, name, &value)?));
        }

        Ok(Self::sorted(&metadata.class, fields))
    }

    fn sorted(class: &str, mut fields: Vec<(String, Value)>) -> Self {
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            class: class.to_string(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// The identifier this key was built from.
    pub fn identifier(&self) -> Identifier {
        match &self.fields[..] {
            [(_, value)] => Identifier::Scalar(value.clone()),
            fields => Identifier::composite(fields.iter().cloned()),
        }
    }

    /// `column = ?` for every identifier column, in declaration order.
    pub(crate) fn filter(&self, metadata: &EntityMetadata) -> Filter {
        metadata
            .identifier_fields()
            .map(|field| {
                let value = self.get(&field.name).cloned().unwrap_or_default();
                (field.column.clone(), value)
            })
            .collect()
    }
}

fn coerce(metadata: &EntityMetadata, name: &str, value: &Value) -> Result<Value> {
    if value.is_blank() {
        return Err(Error::validation(format!(
            "identifier field `{name}` of `{}` cannot be null or empty",
            metadata.class
        )));
    }

    let Some(field) = metadata.field(name) else {
        return Err(Error::mapping(format!(
            "identifier `{name}` of `{}` is not a mapped field",
            metadata.class
        )));
    };

    field.ty.coerce(value.clone()).map_err(|err| {
        err.context(Error::validation(format!(
            "invalid value for identifier field `{name}` of `{}`",
            metadata.class
        )))
    })
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.class, self.identifier())
    }
}
