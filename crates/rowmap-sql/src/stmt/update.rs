use super::Filter;

use rowmap_core::stmt::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,

    /// `column = value` pairs of the `SET` clause
    pub assignments: Vec<(String, Value)>,

    pub filter: Filter,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: vec![],
            filter: Filter::default(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}
