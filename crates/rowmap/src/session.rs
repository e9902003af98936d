use rowmap_core::{
    driver::{Connection, QueryLogger, Rows},
    stmt::Value,
    Error, Result,
};
use rowmap_sql::{Serializer, Statement};

use std::{fmt, rc::Rc, time::Instant};

/// The connection of an entity manager, plus statement logging and
/// transaction nesting.
pub(crate) struct Session {
    connection: Box<dyn Connection>,
    logger: Option<Rc<dyn QueryLogger>>,
    transaction: TransactionManager,
}

/// Tracks how deeply transactions are nested. Only the outermost
/// begin/commit/rollback reach the connection.
#[derive(Debug, Default)]
struct TransactionManager {
    depth: usize,

    /// Set when a nested transaction rolls back. The outermost commit then
    /// rolls back instead.
    rollback_only: bool,
}

impl Session {
    pub(crate) fn new(
        connection: Box<dyn Connection>,
        logger: Option<Rc<dyn QueryLogger>>,
    ) -> Self {
        Self {
            connection,
            logger,
            transaction: TransactionManager::default(),
        }
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.transaction.depth > 0
    }

    pub(crate) fn exec_query(&mut self, stmt: &Statement) -> Result<Rows> {
        let (sql, params) = serialize(stmt);
        self.query(&sql, &params)
    }

    pub(crate) fn exec_update(&mut self, stmt: &Statement) -> Result<u64> {
        let (sql, params) = serialize(stmt);
        self.update(&sql, &params)
    }

    pub(crate) fn query(&mut self, sql: &str, params: &[Value]) -> Result<Rows> {
        let start = Instant::now();
        let result = self.connection.execute_query(sql, params);
        self.log(sql, params, start);
        result
    }

    pub(crate) fn update(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let start = Instant::now();
        let result = self.connection.execute_update(sql, params);
        self.log(sql, params, start);
        result
    }

    pub(crate) fn last_insert_id(&mut self) -> Result<String> {
        self.connection.last_insert_id()
    }

    fn log(&self, sql: &str, params: &[Value], start: Instant) {
        let elapsed = start.elapsed();

        tracing::debug!(
            sql = %sql,
            params = params.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "executed statement"
        );

        if let Some(logger) = &self.logger {
            logger.log_query(sql, params, elapsed);
        }
    }

    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.transaction.depth == 0 {
            self.connection
                .begin_transaction()
                .map_err(|err| err.context(Error::transaction("failed to begin transaction")))?;
        }

        self.transaction.depth += 1;
        tracing::trace!(depth = self.transaction.depth, "begin transaction");
        Ok(())
    }

    /// Commits the current transaction. At the outermost level a failed
    /// commit is followed by a rollback attempt.
    pub(crate) fn commit(&mut self) -> Result<()> {
        match self.transaction.depth {
            0 => Err(Error::transaction("commit without an active transaction")),
            1 => {
                self.transaction.depth = 0;

                if std::mem::take(&mut self.transaction.rollback_only) {
                    self.rollback_connection();
                    return Err(Error::transaction(
                        "transaction was marked rollback-only by a nested rollback",
                    ));
                }

                if let Err(err) = self.connection.commit() {
                    self.rollback_connection();
                    return Err(err.context(Error::transaction("commit failed")));
                }

                tracing::trace!("commit transaction");
                Ok(())
            }
            _ => {
                self.transaction.depth -= 1;
                tracing::trace!(depth = self.transaction.depth, "release nested transaction");
                Ok(())
            }
        }
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        match self.transaction.depth {
            0 => Err(Error::transaction("rollback without an active transaction")),
            1 => {
                self.transaction.depth = 0;
                self.transaction.rollback_only = false;

                tracing::trace!("rollback transaction");
                self.connection
                    .rollback()
                    .map_err(|err| err.context(Error::transaction("rollback failed")))
            }
            _ => {
                self.transaction.depth -= 1;
                self.transaction.rollback_only = true;
                tracing::trace!(depth = self.transaction.depth, "nested rollback");
                Ok(())
            }
        }
    }

    fn rollback_connection(&mut self) {
        if let Err(err) = self.connection.rollback() {
            tracing::warn!(error = %err, "rollback failed");
        }
    }
}

fn serialize(stmt: &Statement) -> (String, Vec<Value>) {
    let mut params = vec![];
    let sql = Serializer::new().serialize(stmt, &mut params);
    (sql, params)
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("logger", &self.logger.is_some())
            .field("transaction", &self.transaction)
            .finish()
    }
}
