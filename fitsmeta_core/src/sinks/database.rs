//! Database sink and the cursor abstraction it runs statements through

use super::OutputTarget;
use super::sql::{ExistenceQuery, SqlMode, SqlScriptSink, SqlValue, Statement};
use crate::Result;
use crate::bundle::MetadataBundle;
use crate::config::{CatalogAliasSets, DbConfig, TableName};
use crate::error::ValidationError;
use crate::pipeline::{Sink, Stage};
use log::{debug, warn};
use std::fmt::Debug;

/// A database session inside one open transaction
///
/// Statements use `%s` placeholders; implementations bind `values` through
/// the driver.
pub trait SqlCursor {
    /// Run a statement, returning the number of affected rows
    fn execute(&mut self, sql: &str, values: &[SqlValue]) -> Result<u64>;

    /// First column of every row returned by a query, as text
    fn query_column(&mut self, sql: &str, values: &[SqlValue]) -> Result<Vec<String>>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// Opens cursors; one per bundle
pub trait CursorFactory: Debug {
    fn connect(&self, db_uri: &str) -> Result<Box<dyn SqlCursor>>;
}

/// Whether `table` exists according to `query`
pub fn table_exists(cursor: &mut dyn SqlCursor, query: ExistenceQuery, table: &TableName) -> Result<bool> {
    let statement = query.statement(table);
    let names = cursor.query_column(&statement.sql, &statement.values)?;
    Ok(query.contains(&names, table))
}

/// Runs the statements for each bundle against the database
///
/// Each bundle gets its own connection and transaction. Any failure rolls
/// the transaction back. With `sql_only` the statements are written to a
/// text target instead.
#[derive(Debug)]
pub struct DatabaseSink {
    mode: SqlMode,
    config: DbConfig,
    table: TableName,
    alias_sets: CatalogAliasSets,
    factory: Box<dyn CursorFactory>,
    sql_only: Option<OutputTarget>,
}

impl DatabaseSink {
    pub fn new(mode: SqlMode, config: DbConfig, table: TableName, factory: Box<dyn CursorFactory>) -> Self {
        Self {
            mode,
            config,
            table,
            alias_sets: CatalogAliasSets::default(),
            factory,
            sql_only: None,
        }
    }

    pub fn with_alias_sets(mut self, alias_sets: CatalogAliasSets) -> Self {
        self.alias_sets = alias_sets;
        self
    }

    /// Write SQL to `target` instead of executing it
    pub fn sql_only(mut self, target: OutputTarget) -> Self {
        self.sql_only = Some(target);
        self
    }

    fn statements(&self, bundle: &MetadataBundle) -> Result<Vec<Statement>> {
        self.mode
            .statements(bundle, &self.table, &self.config.db_user, &self.alias_sets)
    }

    fn run(&self, cursor: &mut dyn SqlCursor, statements: &[Statement]) -> Result<()> {
        match self.mode {
            SqlMode::CreateTable => {
                if table_exists(cursor, self.config.db_existence_query, &self.table)? {
                    warn!("Table {} already exists, not creating it", self.table);
                    return Ok(());
                }
            }
            SqlMode::FillCatalog => {
                if !table_exists(cursor, self.config.db_existence_query, &self.table)? {
                    return Err(ValidationError::table_not_found(&self.table.to_string()).into());
                }
            }
            SqlMode::ObsCoreRow | SqlMode::HybridRow => {}
        }

        let mut affected = 0;
        for statement in statements {
            affected += cursor.execute(&statement.sql, &statement.values)?;
        }
        debug!(
            "Executed {} statements on {} ({affected} rows)",
            statements.len(),
            self.table
        );
        Ok(())
    }
}

impl Stage for DatabaseSink {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        Ok(bundle)
    }

    fn name(&self) -> &str {
        match self.mode {
            SqlMode::ObsCoreRow | SqlMode::HybridRow => "db_row",
            SqlMode::CreateTable => "db_create_table",
            SqlMode::FillCatalog => "db_fill",
        }
    }
}

impl Sink for DatabaseSink {
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()> {
        if let Some(target) = &self.sql_only {
            let mut script = SqlScriptSink::new(
                self.mode,
                self.table.clone(),
                self.config.db_user.clone(),
                target.clone(),
            )
            .with_alias_sets(self.alias_sets.clone());
            return script.output_results(bundle);
        }

        let statements = self.statements(bundle)?;
        let mut cursor = self.factory.connect(&self.config.db_uri)?;
        match self.run(cursor.as_mut(), &statements) {
            Ok(()) => cursor.commit(),
            Err(e) => {
                if let Err(rollback) = cursor.rollback() {
                    warn!("Rollback on {} failed: {rollback}", self.table);
                }
                Err(e)
            }
        }
    }
}

#[cfg(feature = "database")]
pub use self::postgres::{PgCursor, PgCursorFactory};

#[cfg(feature = "database")]
mod postgres {
    use super::{CursorFactory, SqlCursor};
    use crate::Result;
    use crate::error::DatabaseError;
    use crate::sinks::sql::{SqlValue, to_numbered_placeholders};
    use sqlx::postgres::{PgArguments, PgConnection, Postgres};
    use sqlx::query::Query;
    use sqlx::{Connection, Row};
    use tokio::runtime::{Builder, Runtime};

    fn bind<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &'q SqlValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(t) => query.bind(*t),
            SqlValue::Json(j) => query.bind(sqlx::types::Json(j)),
        }
    }

    /// PostgreSQL cursor driving `sqlx` on a private current-thread runtime
    ///
    /// A transaction is opened on connect. The connection is closed on drop,
    /// which discards anything not committed.
    #[derive(Debug)]
    pub struct PgCursor {
        runtime: Runtime,
        connection: Option<PgConnection>,
    }

    impl PgCursor {
        pub fn connect(db_uri: &str) -> Result<Self> {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| DatabaseError::connect(e.to_string()))?;
            let mut connection = runtime
                .block_on(PgConnection::connect(db_uri))
                .map_err(|e| DatabaseError::connect(e.to_string()))?;
            runtime.block_on(sqlx::query("BEGIN").execute(&mut connection))?;
            Ok(Self {
                runtime,
                connection: Some(connection),
            })
        }

        fn simple(&mut self, sql: &str) -> Result<()> {
            let connection = self
                .connection
                .as_mut()
                .ok_or_else(|| DatabaseError::execute("connection is closed"))?;
            self.runtime.block_on(sqlx::query(sql).execute(connection))?;
            Ok(())
        }
    }

    impl SqlCursor for PgCursor {
        fn execute(&mut self, sql: &str, values: &[SqlValue]) -> Result<u64> {
            let sql = to_numbered_placeholders(sql);
            let connection = self
                .connection
                .as_mut()
                .ok_or_else(|| DatabaseError::execute("connection is closed"))?;
            let query = values.iter().fold(sqlx::query(&sql), bind);
            let result = self.runtime.block_on(query.execute(connection))?;
            Ok(result.rows_affected())
        }

        fn query_column(&mut self, sql: &str, values: &[SqlValue]) -> Result<Vec<String>> {
            let sql = to_numbered_placeholders(sql);
            let connection = self
                .connection
                .as_mut()
                .ok_or_else(|| DatabaseError::execute("connection is closed"))?;
            let query = values.iter().fold(sqlx::query(&sql), bind);
            let rows = self.runtime.block_on(query.fetch_all(connection))?;
            rows.iter()
                .map(|row| row.try_get::<String, _>(0).map_err(Into::into))
                .collect()
        }

        fn commit(&mut self) -> Result<()> {
            self.simple("COMMIT")
        }

        fn rollback(&mut self) -> Result<()> {
            self.simple("ROLLBACK")
        }
    }

    impl Drop for PgCursor {
        fn drop(&mut self) {
            if let Some(connection) = self.connection.take() {
                let _ = self.runtime.block_on(connection.close());
            }
        }
    }

    /// Opens a [`PgCursor`] per bundle
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PgCursorFactory;

    impl CursorFactory for PgCursorFactory {
        fn connect(&self, db_uri: &str) -> Result<Box<dyn SqlCursor>> {
            Ok(Box::new(PgCursor::connect(db_uri)?))
        }
    }
}
