#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::Comma;

mod params;
pub use params::{Params, Placeholder};

// Fragment serializers
mod filter;
mod statement;
mod value;

use crate::stmt::Statement;

/// Serialize a statement to a SQL string.
///
/// Values are never inlined: each one is pushed to `params` and replaced by
/// a `?` placeholder. `LIMIT`/`OFFSET` follow SQLite syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct Serializer;

struct Formatter<'a, T> {
    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer
    }

    pub fn serialize(&self, stmt: &Statement, params: &mut impl Params) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            dst: &mut ret,
            params,
        };

        stmt.to_sql(&mut fmt);

        ret
    }
}
