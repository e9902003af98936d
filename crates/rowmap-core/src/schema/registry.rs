use super::{
    AssociationJoin, AssociationKind, EntityMetadata, JoinColumn, JoinStep, Mapping,
};
use crate::{Error, Result};

use indexmap::IndexMap;
use std::{cell::RefCell, collections::HashMap, fmt, sync::Arc};

type MappingFn = Box<dyn Fn() -> Mapping>;

/// Builds and memoizes [`EntityMetadata`] from registered mappings.
pub struct Registry {
    mappings: IndexMap<String, MappingFn>,
    memo: RefCell<HashMap<String, Arc<EntityMetadata>>>,
    memoize: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            mappings: IndexMap::new(),
            memo: RefCell::new(HashMap::new()),
            memoize: true,
        }
    }

    /// Enables or disables memoization of built metadata.
    pub fn set_memoize(&mut self, memoize: bool) {
        self.memoize = memoize;
        if !memoize {
            self.memo.get_mut().clear();
        }
    }

    /// Registers the mapping of `class`. Re-registering a class replaces its
    /// mapping and drops any memoized metadata for it.
    pub fn register(&mut self, class: impl Into<String>, mapping: impl Fn() -> Mapping + 'static) {
        let class = class.into();
        self.memo.get_mut().remove(&class);
        self.mappings.insert(class, Box::new(mapping));
    }

    pub fn is_registered(&self, class: &str) -> bool {
        self.mappings.contains_key(class)
    }

    /// Registered class names, in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.mappings.keys().map(|class| &class[..])
    }

    pub fn is_memoized(&self, class: &str) -> bool {
        self.memo.borrow().contains_key(class)
    }

    /// Returns the metadata of `class`.
    pub fn describe(&self, class: &str) -> Result<Arc<EntityMetadata>> {
        if class.trim().is_empty() {
            return Err(Error::validation("class name cannot be empty"));
        }

        if let Some(metadata) = self.memo.borrow().get(class) {
            tracing::trace!(class, "metadata cache hit");
            return Ok(metadata.clone());
        }

        tracing::trace!(class, "building metadata");
        let metadata = Arc::new(self.build(class)?);

        if self.memoize {
            self.memo
                .borrow_mut()
                .insert(class.to_string(), metadata.clone());
        }

        Ok(metadata)
    }

    /// Drops memoized metadata for `class`.
    pub fn invalidate(&self, class: &str) {
        self.memo.borrow_mut().remove(class);
    }

    /// Drops all memoized metadata.
    pub fn invalidate_all(&self) {
        self.memo.borrow_mut().clear();
    }

    fn build(&self, class: &str) -> Result<EntityMetadata> {
        let Some(mapping) = self.mappings.get(class) else {
            return Err(Error::mapping(format!("class `{class}` is not an entity")));
        };
        let mapping = mapping();

        if !mapping.is_entity {
            return Err(Error::mapping(format!("class `{class}` is not an entity")));
        }

        let mut fields = IndexMap::new();
        let mut identifiers = vec![];

        for def in mapping.fields {
            let (field, is_id) = def.build(class)?;

            if fields.contains_key(&field.name) {
                return Err(Error::mapping(format!(
                    "field `{}` is mapped twice on `{class}`",
                    field.name
                )));
            }

            if is_id {
                identifiers.push(field.name.clone());
            }

            fields.insert(field.name.clone(), field);
        }

        let mut associations = IndexMap::new();

        for association in mapping.associations {
            let name = &association.name;

            if association.target.trim().is_empty() {
                return Err(Error::mapping(format!(
                    "association `{class}.{name}` has no target entity"
                )));
            }

            if !self.is_registered(&association.target) {
                return Err(Error::mapping(format!(
                    "association `{class}.{name}` targets unknown class `{}`",
                    association.target
                )));
            }

            if fields.contains_key(name) || associations.contains_key(name) {
                return Err(Error::mapping(format!(
                    "`{name}` is mapped twice on `{class}`"
                )));
            }

            let missing = match association.kind {
                AssociationKind::ManyToOne => association.join_column.is_none(),
                AssociationKind::OneToOne => {
                    association.join_column.is_none() && association.mapped_by.is_none()
                }
                AssociationKind::OneToMany => association.mapped_by.is_none(),
                AssociationKind::ManyToMany => {
                    association.join_table.is_none() && association.mapped_by.is_none()
                }
            };

            if missing {
                let needs = match association.kind {
                    AssociationKind::ManyToOne => "a join column",
                    AssociationKind::OneToOne => "a join column or mapped_by",
                    AssociationKind::OneToMany => "mapped_by",
                    AssociationKind::ManyToMany => "a join table or mapped_by",
                };
                return Err(Error::mapping(format!(
                    "{} association `{class}.{name}` requires {needs}",
                    association.kind.name()
                )));
            }

            if let Some(join_table) = &association.join_table {
                if join_table.join_columns.is_empty() || join_table.inverse_join_columns.is_empty()
                {
                    return Err(Error::mapping(format!(
                        "join table `{}` of `{class}.{name}` requires join columns on both sides",
                        join_table.name
                    )));
                }
            }

            associations.insert(name.clone(), association);
        }

        Ok(EntityMetadata {
            class: class.to_string(),
            table: mapping.table.unwrap_or_else(|| class.to_lowercase()),
            schema: mapping.schema,
            identifiers,
            fields,
            associations,
            id_generator: mapping.id_generator,
        })
    }

    /// Resolves the joins implementing `source.association`, with
    /// `source_alias` naming the source table and `target_alias` the target.
    ///
    /// * many-to-one, and one-to-one on the owning side:
    ///   `source.join_column = target.referenced_column`
    /// * one-to-many, and one-to-one on the inverse side: the join column of
    ///   the `mapped_by` association on the target, reversed
    /// * many-to-many: through the join table, aliased
    ///   `<source_alias>_<target_alias>`
    pub fn association_join(
        &self,
        source: &str,
        association: &str,
        source_alias: &str,
        target_alias: &str,
    ) -> Result<AssociationJoin> {
        let metadata = self.describe(source)?;
        let Some(assoc) = metadata.association(association) else {
            return Err(Error::mapping(format!(
                "`{source}` has no association `{association}`"
            )));
        };
        let target = self.describe(&assoc.target)?;

        let steps = match (assoc.kind, &assoc.join_column, &assoc.mapped_by) {
            (AssociationKind::ManyToOne | AssociationKind::OneToOne, Some(join_column), _) => {
                vec![JoinStep {
                    table: target.full_table_name(),
                    alias: target_alias.to_string(),
                    condition: equals(
                        source_alias,
                        &join_column.name,
                        target_alias,
                        &join_column.referenced_column_name,
                    ),
                }]
            }
            (AssociationKind::OneToMany | AssociationKind::OneToOne, None, Some(mapped_by)) => {
                let inverse = inverse_of(&target, mapped_by, source, association)?;
                let Some(join_column) = &inverse.join_column else {
                    return Err(Error::mapping(format!(
                        "`{}.{mapped_by}` (inverse of `{source}.{association}`) has no join column",
                        target.class
                    )));
                };

                vec![JoinStep {
                    table: target.full_table_name(),
                    alias: target_alias.to_string(),
                    condition: equals(
                        target_alias,
                        &join_column.name,
                        source_alias,
                        &join_column.referenced_column_name,
                    ),
                }]
            }
            (AssociationKind::ManyToMany, _, mapped_by) => {
                // On the inverse side the owning association's columns are
                // used with their roles swapped.
                let (join_table, source_columns, target_columns) = match mapped_by {
                    None => {
                        let Some(join_table) = &assoc.join_table else {
                            return Err(Error::mapping(format!(
                                "many-to-many association `{source}.{association}` requires a join table"
                            )));
                        };
                        (
                            join_table,
                            &join_table.join_columns,
                            &join_table.inverse_join_columns,
                        )
                    }
                    Some(mapped_by) => {
                        let inverse = inverse_of(&target, mapped_by, source, association)?;
                        let Some(join_table) = &inverse.join_table else {
                            return Err(Error::mapping(format!(
                                "`{}.{mapped_by}` (inverse of `{source}.{association}`) has no join table",
                                target.class
                            )));
                        };
                        (
                            join_table,
                            &join_table.inverse_join_columns,
                            &join_table.join_columns,
                        )
                    }
                };

                let link_alias = format!("{source_alias}_{target_alias}");

                vec![
                    JoinStep {
                        table: join_table.full_name(),
                        alias: link_alias.clone(),
                        condition: conjunction(source_columns, |column| {
                            equals(
                                &link_alias,
                                &column.name,
                                source_alias,
                                &column.referenced_column_name,
                            )
                        }),
                    },
                    JoinStep {
                        table: target.full_table_name(),
                        alias: target_alias.to_string(),
                        condition: conjunction(target_columns, |column| {
                            equals(
                                target_alias,
                                &column.referenced_column_name,
                                &link_alias,
                                &column.name,
                            )
                        }),
                    },
                ]
            }
            _ => {
                return Err(Error::mapping(format!(
                    "{} association `{source}.{association}` has no join column or mapped_by",
                    assoc.kind.name()
                )))
            }
        };

        Ok(AssociationJoin {
            target: target.class.clone(),
            steps,
        })
    }
}

fn inverse_of<'a>(
    target: &'a EntityMetadata,
    mapped_by: &str,
    source: &str,
    association: &str,
) -> Result<&'a super::Association> {
    target.association(mapped_by).ok_or_else(|| {
        Error::mapping(format!(
            "`{source}.{association}` is mapped by `{}.{mapped_by}`, which does not exist",
            target.class
        ))
    })
}

fn equals(lhs_alias: &str, lhs: &str, rhs_alias: &str, rhs: &str) -> String {
    format!("{lhs_alias}.{lhs} = {rhs_alias}.{rhs}")
}

fn conjunction(columns: &[JoinColumn], f: impl Fn(&JoinColumn) -> String) -> String {
    columns.iter().map(f).collect::<Vec<_>>().join(" AND ")
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.mappings.keys().collect::<Vec<_>>())
            .field("memoize", &self.memoize)
            .finish()
    }
}
