use crate::stmt::Value;

use std::time::Duration;

/// Receives every statement executed through an entity manager.
pub trait QueryLogger {
    fn log_query(&self, sql: &str, params: &[Value], elapsed: Duration);
}

impl<F> QueryLogger for F
where
    F: Fn(&str, &[Value], Duration),
{
    fn log_query(&self, sql: &str, params: &[Value], elapsed: Duration) {
        self(sql, params, elapsed)
    }
}
