//! Recording database cursor

use fitsmeta_core::error::DatabaseError;
use fitsmeta_core::sinks::{CursorFactory, SqlCursor, SqlValue, Statement};
use fitsmeta_core::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything the cursors of one factory were asked to do
#[derive(Debug, Default)]
pub struct Journal {
    pub connections: Vec<String>,
    pub executed: Vec<Statement>,
    pub queries: Vec<Statement>,
    pub commits: usize,
    pub rollbacks: usize,
}

/// Cursor that records statements instead of running them
///
/// `query_column` answers with the configured table names, so existence
/// checks can be steered from the test.
#[derive(Debug)]
pub struct RecordingCursor {
    journal: Arc<Mutex<Journal>>,
    tables: Vec<String>,
    fail_on: Option<String>,
}

impl RecordingCursor {
    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SqlCursor for RecordingCursor {
    fn execute(&mut self, sql: &str, values: &[SqlValue]) -> Result<u64> {
        if self.fail_on.as_deref().is_some_and(|needle| sql.contains(needle)) {
            return Err(DatabaseError::execute(format!("mock failure on: {sql}")).into());
        }
        self.journal()
            .executed
            .push(Statement::new(sql, values.to_vec()));
        Ok(1)
    }

    fn query_column(&mut self, sql: &str, values: &[SqlValue]) -> Result<Vec<String>> {
        self.journal()
            .queries
            .push(Statement::new(sql, values.to_vec()));
        Ok(self.tables.clone())
    }

    fn commit(&mut self) -> Result<()> {
        self.journal().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.journal().rollbacks += 1;
        Ok(())
    }
}

/// Factory handing out [`RecordingCursor`]s that share one [`Journal`]
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    journal: Arc<Mutex<Journal>>,
    tables: Vec<String>,
    fail_on: Option<String>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables the existence query reports
    pub fn with_tables(mut self, tables: &[&str]) -> Self {
        self.tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Fail any statement whose SQL contains `needle`
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Shared journal, readable after the factory was moved into a sink
    pub fn journal(&self) -> Arc<Mutex<Journal>> {
        Arc::clone(&self.journal)
    }
}

impl CursorFactory for RecordingFactory {
    fn connect(&self, db_uri: &str) -> Result<Box<dyn SqlCursor>> {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .connections
            .push(db_uri.to_string());
        Ok(Box::new(RecordingCursor {
            journal: Arc::clone(&self.journal),
            tables: self.tables.clone(),
            fail_on: self.fail_on.clone(),
        }))
    }
}
