use super::{Association, FieldDef};

/// How identifier values are produced on insert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdGenerator {
    /// The database assigns the identifier; it is read back through
    /// `last_insert_id` after the insert.
    #[default]
    Identity,

    /// The caller assigns the identifier before persisting.
    Sequence,
}

/// Declarative description of how a type maps to a table.
///
/// A mapping only describes an entity when created with
/// [`Mapping::entity`]; the registry refuses to build metadata otherwise.
///
/// ```
/// # use rowmap_core::schema::{Association, FieldDef, FieldType, Mapping};
/// # use rowmap_core::accessor;
/// #[derive(Default)]
/// struct Post {
///     id: Option<i64>,
///     title: String,
///     author_id: Option<i64>,
/// }
///
/// let mapping = Mapping::entity()
///     .table("posts")
///     .field(FieldDef::new("id", FieldType::Integer, accessor!(Post, id)).id())
///     .field(FieldDef::new("title", FieldType::String, accessor!(Post, title)).length(255))
///     .field(
///         FieldDef::new("authorId", FieldType::Integer, accessor!(Post, author_id))
///             .column("author_id")
///             .nullable(),
///     )
///     .association(Association::many_to_one("author", "User").join_column("author_id", "id"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub(crate) is_entity: bool,
    pub(crate) table: Option<String>,
    pub(crate) schema: Option<String>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) associations: Vec<Association>,
    pub(crate) id_generator: IdGenerator,
}

impl Mapping {
    /// An entity mapping.
    pub fn entity() -> Self {
        Self {
            is_entity: true,
            ..Self::default()
        }
    }

    /// A mapping without the entity marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table name. Defaults to the lowercased class name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    pub fn generated(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn is_entity(&self) -> bool {
        self.is_entity
    }
}
