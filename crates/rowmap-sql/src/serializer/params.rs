use super::{Formatter, ToSql};

use rowmap_core::stmt::Value;

pub trait Params {
    fn push(&mut self, param: &Value) -> Placeholder;
}

/// Position (1-based) of a pushed parameter.
pub struct Placeholder(pub usize);

impl Params for Vec<Value> {
    fn push(&mut self, value: &Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push('?');
    }
}
