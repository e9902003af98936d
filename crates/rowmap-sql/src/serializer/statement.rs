use super::{Comma, Formatter, Params, ToSql};

use crate::stmt::{self, Projection, Statement};
use rowmap_core::stmt::Value;

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Select(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.table;

        if self.columns.is_empty() {
            fmt!(f, "INSERT INTO " table " DEFAULT VALUES");
            return;
        }

        let columns = Comma(&self.columns);
        let values = Comma(&self.values);

        fmt!(f, "INSERT INTO " table " (" columns ") VALUES (" values ")");
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.table;
        let assignments = Comma(self.assignments.iter().map(Assignment));
        let filter = &self.filter;

        fmt!(f, "UPDATE " table " SET " assignments filter);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.table;
        let filter = &self.filter;

        fmt!(f, "DELETE FROM " table filter);
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match &self.projection {
            Projection::Columns(columns) => fmt!(f, "SELECT " Comma(columns)),
            Projection::Count => fmt!(f, "SELECT COUNT(*)"),
            Projection::Aggregate(aggregate, column) => {
                let function = aggregate.as_sql();
                fmt!(f, "SELECT " function "(" column ")");
            }
        }

        let table = &self.table;
        let filter = &self.filter;
        fmt!(f, " FROM " table filter);

        if !self.order_by.is_empty() {
            let order_by = Comma(self.order_by.iter().map(OrderBy));
            fmt!(f, " ORDER BY " order_by);
        }

        let limit = self.limit.map(|limit| limit.to_string());
        let offset = self.offset.map(|offset| offset.to_string());

        match (&limit, &offset) {
            (Some(limit), _) => fmt!(f, " LIMIT " limit),
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(_)) => fmt!(f, " LIMIT -1"),
            (None, None) => {}
        }

        if let Some(offset) = &offset {
            fmt!(f, " OFFSET " offset);
        }
    }
}

struct Assignment<'a>(&'a (String, Value));

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let (column, value) = self.0;
        fmt!(f, column " = " value);
    }
}

struct OrderBy<'a>(&'a (String, stmt::Direction));

impl ToSql for OrderBy<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let (column, direction) = self.0;
        fmt!(f, column " " direction.as_sql());
    }
}
