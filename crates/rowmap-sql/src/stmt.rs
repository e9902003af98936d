//! Statements issued by the unit of work and repositories.

mod delete;
pub use delete::Delete;

mod filter;
pub use filter::Filter;

mod insert;
pub use insert::Insert;

mod select;
pub use select::{Aggregate, Direction, Projection, Select};

mod update;
pub use update::Update;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Delete(Delete),
    Insert(Insert),
    Select(Select),
    Update(Update),
}

impl Statement {
    /// Returns `true` if the statement reads rows rather than modifying them.
    pub fn is_query(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Self::Delete(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Self::Select(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Self::Update(value)
    }
}
