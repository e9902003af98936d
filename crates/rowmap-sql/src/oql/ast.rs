//! Parsed form of an OQL query.
//!
//! Clause bodies (projection, conditions, ordering) are kept as text with
//! whitespace normalized; field references inside them are translated to
//! columns when the query is compiled.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Projection, e.g. `*`, `u` or `u.username, COUNT(p.id)`
    pub select: String,

    /// Root entity class
    pub from: String,

    /// Alias of the root entity
    pub alias: Option<String>,

    pub joins: Vec<Join>,

    /// `WHERE` condition
    pub filter: Option<String>,

    pub order_by: Option<String>,

    /// Alias to entity class, in the order the aliases were introduced
    pub aliases: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,

    /// Class of the joined entity
    pub entity: String,

    pub alias: String,

    /// The `ON` condition of an explicit join, or the `WITH` condition of an
    /// association join
    pub condition: Option<String>,

    /// Set for the association form `alias.association`
    pub association: Option<AssociationRef>,
}

/// `source.name` in an association join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRef {
    pub source: String,
    pub name: String,
}

impl Query {
    /// Class bound to `alias`, if any.
    pub fn entity_of(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(|class| &class[..])
    }
}
