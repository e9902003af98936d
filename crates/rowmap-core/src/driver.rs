mod logger;
pub use logger::QueryLogger;

mod rows;
pub use rows::{Row, Rows};

use crate::stmt::Value;

use std::fmt::Debug;

/// A synchronous connection to a relational database.
///
/// SQL handed to a connection uses `?` positional placeholders and `params`
/// are supplied in the order the placeholders appear in the text.
pub trait Connection: Debug {
    /// Execute a statement returning rows
    fn execute_query(&mut self, sql: &str, params: &[Value]) -> crate::Result<Rows>;

    /// Execute a statement returning the number of affected rows
    fn execute_update(&mut self, sql: &str, params: &[Value]) -> crate::Result<u64>;

    /// The identifier generated by the most recent insert, as text.
    fn last_insert_id(&mut self) -> crate::Result<String>;

    fn begin_transaction(&mut self) -> crate::Result<()>;

    fn commit(&mut self) -> crate::Result<()>;

    fn rollback(&mut self) -> crate::Result<()>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute_query(&mut self, sql: &str, params: &[Value]) -> crate::Result<Rows> {
        (**self).execute_query(sql, params)
    }

    fn execute_update(&mut self, sql: &str, params: &[Value]) -> crate::Result<u64> {
        (**self).execute_update(sql, params)
    }

    fn last_insert_id(&mut self) -> crate::Result<String> {
        (**self).last_insert_id()
    }

    fn begin_transaction(&mut self) -> crate::Result<()> {
        (**self).begin_transaction()
    }

    fn commit(&mut self) -> crate::Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> crate::Result<()> {
        (**self).rollback()
    }
}
