//! Entity mapping metadata

mod accessor;
pub use accessor::Accessor;

mod association;
pub use association::{Association, AssociationKind, FetchMode, JoinColumn, JoinTable};

mod field;
pub use field::{FieldDef, FieldMapping, FieldType};

mod join;
pub use join::{AssociationJoin, JoinStep};

mod mapping;
pub use mapping::{IdGenerator, Mapping};

mod metadata;
pub use metadata::{EntityMetadata, Snapshot};

mod registry;
pub use registry::Registry;

mod validator;
pub use validator::SchemaValidator;

/// Maximum length accepted for a column with a length constraint.
pub const MAX_COLUMN_LENGTH: u32 = 8000;
