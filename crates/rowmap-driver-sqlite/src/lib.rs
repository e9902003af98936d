mod value;
use value::Value;

use rowmap_core::{
    driver::{Row, Rows},
    stmt, Error, Result,
};
use rusqlite::Connection as RusqliteConnection;
use std::path::Path;

/// A [`rowmap_core::Connection`] backed by a single SQLite database.
#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::driver)?;
        Ok(Self { connection })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver)?;
        Ok(Self { connection })
    }

    /// Runs semicolon-separated statements without parameters, e.g. to
    /// create tables.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.connection.execute_batch(sql).map_err(Error::driver)
    }
}

impl rowmap_core::Connection for Connection {
    fn execute_query(&mut self, sql: &str, params: &[stmt::Value]) -> Result<Rows> {
        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let params = params.iter().cloned().map(Value::from).collect::<Vec<_>>();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver)?;

        let mut ret = vec![];

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut record = Row::new();

                    for (index, column) in columns.iter().enumerate() {
                        let value = row.get_ref(index).map_err(Error::driver)?;
                        record.insert(column.clone(), Value::from_sql(value).into_inner());
                    }

                    ret.push(record);
                }
                Ok(None) => break,
                Err(err) => return Err(Error::driver(err)),
            }
        }

        Ok(Rows::new(ret))
    }

    fn execute_update(&mut self, sql: &str, params: &[stmt::Value]) -> Result<u64> {
        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;

        let params = params.iter().cloned().map(Value::from).collect::<Vec<_>>();
        let count = stmt
            .execute(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver)?;

        Ok(count as u64)
    }

    fn last_insert_id(&mut self) -> Result<String> {
        Ok(self.connection.last_insert_rowid().to_string())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        tracing::trace!("BEGIN");
        self.connection.execute("BEGIN", []).map_err(Error::driver)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        tracing::trace!("COMMIT");
        self.connection.execute("COMMIT", []).map_err(Error::driver)?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        tracing::trace!("ROLLBACK");
        self.connection
            .execute("ROLLBACK", [])
            .map_err(Error::driver)?;
        Ok(())
    }
}
