use super::{Formatter, Params, ToSql};

use crate::stmt::Filter;

/// ` WHERE a = ? AND b IS NULL`, or nothing for an empty filter.
impl ToSql for &Filter {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let mut s = " WHERE ";
        for (column, value) in &self.conditions {
            if value.is_null() {
                fmt!(f, s column " IS NULL");
            } else {
                fmt!(f, s column " = " value);
            }
            s = " AND ";
        }
    }
}
