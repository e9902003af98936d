mod entity;
pub use entity::{Entity, Handle, Oid};

pub mod entity_manager;
pub use entity_manager::EntityManager;

mod query;
pub use query::Query;

mod reference;
pub use reference::Reference;

mod repository;
pub use repository::{Criteria, Page, Repository, MAX_PAGE_SIZE};

mod session;

pub mod unit_of_work;
pub use unit_of_work::{EntityState, IdentityKey, UnitOfWork};

pub use rowmap_core::{
    accessor, bail, err,
    driver::{Connection, QueryLogger, Row, Rows},
    schema::{
        Association, EntityMetadata, FetchMode, FieldDef, FieldType, IdGenerator, JoinColumn,
        JoinTable, Mapping,
    },
    stmt::{Identifier, Value},
    Error, Result,
};
pub use rowmap_sql::{
    stmt::{Aggregate, Direction},
    ParseCache,
};
