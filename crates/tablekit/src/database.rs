//! The [`Database`] handle: one connection plus its schema cache.

use crate::client::GenericClient;
use crate::config::{ColumnDef, DatabaseConfig, TableDef, add_columns_sql};
use crate::error::{DbError, DbResult};
use crate::filter::FilterMap;
use crate::ident::quote_ident;
use crate::monitor::SqlLogger;
use crate::row::RowMap;
use crate::schema::SchemaCache;
use crate::statement::{
    DeleteStatement, InsertStatement, SelectStatement, Statement, UpdateStatement,
};
use crate::value::Value;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

/// Owns the spawned connection future; aborts it when dropped.
struct ConnectionTask(Option<JoinHandle<()>>);

impl ConnectionTask {
    async fn join(mut self) -> DbResult<()> {
        match self.0.take() {
            Some(handle) => handle
                .await
                .map_err(|e| DbError::Connection(format!("connection task failed: {e}"))),
            None => Ok(()),
        }
    }
}

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

async fn open(config: &tokio_postgres::Config, dbname: &str) -> DbResult<(Client, ConnectionTask)> {
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| DbError::from_connect_error(e, dbname))?;

    let dbname = dbname.to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(target: "tablekit", database = %dbname, error = %e, "connection error");
        }
    });
    Ok((client, ConnectionTask(Some(handle))))
}

/// `CREATE DATABASE` through the maintenance database.
///
/// A concurrent creator winning the race counts as success.
async fn create_database(config: &DatabaseConfig, name: &str) -> DbResult<()> {
    let creation_error = |message: String| DbError::DatabaseCreation {
        name: name.to_string(),
        message,
    };

    let maintenance = config.maintenance_config()?;
    let (client, task) = open(&maintenance, &config.maintenance_db)
        .await
        .map_err(|e| creation_error(e.to_string()))?;

    let sql = format!("CREATE DATABASE {}", quote_ident(name));
    let result = match client.batch_execute(&sql).await {
        Ok(()) => {
            tracing::info!(target: "tablekit", database = name, "database created");
            Ok(())
        }
        Err(e) if e.code() == Some(&SqlState::DUPLICATE_DATABASE) => Ok(()),
        Err(e) => Err(creation_error(e.to_string())),
    };

    drop(client);
    task.join().await?;
    result
}

/// A connection to one PostgreSQL database plus the schema cache every
/// statement is checked against.
///
/// Reads take `&self`; writes that need a transaction and schema changes
/// take `&mut self`. Dropping the handle aborts the connection task; call
/// [`close`](Self::close) to shut it down cleanly.
pub struct Database {
    client: Client,
    connection: ConnectionTask,
    schema: SchemaCache,
    config: DatabaseConfig,
    logger: SqlLogger,
}

impl Database {
    /// Connect, creating the database first when it is missing and
    /// `create_if_missing` is set, then load the schema cache.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        config.validate()?;
        let name = config.database_name()?;
        let pg = config.pg_config()?;

        let (client, connection) = match open(&pg, &name).await {
            Ok(pair) => pair,
            Err(DbError::DatabaseNotFound { .. }) if config.create_if_missing => {
                create_database(config, &name).await?;
                open(&pg, &name).await?
            }
            Err(e) => return Err(e),
        };

        let schema = SchemaCache::load(&client, &config.schemas).await?;
        tracing::info!(
            target: "tablekit",
            database = %name,
            tables = schema.tables.len(),
            "connected"
        );

        let logger = match config.log_sql_max_len {
            Some(len) => SqlLogger::new().max_sql_length(len),
            None => SqlLogger::new().no_truncate(),
        };

        Ok(Self {
            client,
            connection,
            schema,
            config: config.clone(),
            logger,
        })
    }

    /// Replace the SQL logger.
    pub fn with_logger(mut self, logger: SqlLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// The underlying driver client, for anything the builders do not cover.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Insert `rows` into `table` inside one transaction.
    ///
    /// Every statement is built (and so checked against the schema) before
    /// the transaction starts; a failing row rolls back the whole batch.
    /// Returns the number of inserted rows.
    pub async fn insert<I>(&mut self, table: &str, rows: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = RowMap>,
    {
        let statements = self.build_inserts(table, rows, &[])?;
        if statements.is_empty() {
            return Ok(0);
        }

        let logger = &self.logger;
        let result: DbResult<u64> = crate::transaction!(&mut self.client, tx, {
            let mut affected = 0;
            for stmt in &statements {
                affected += stmt.execute_with(&tx, logger).await?;
            }
            Ok(affected)
        });
        if let Err(e) = &result {
            warn_rollback(table, statements.len(), e);
        }
        result
    }

    /// Like [`insert`](Self::insert), returning the `RETURNING` rows of every insert.
    pub async fn insert_returning<I>(
        &mut self,
        table: &str,
        rows: I,
        returning: &[&str],
    ) -> DbResult<Vec<RowMap>>
    where
        I: IntoIterator<Item = RowMap>,
    {
        let statements = self.build_inserts(table, rows, returning)?;
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let logger = &self.logger;
        let result: DbResult<Vec<RowMap>> = crate::transaction!(&mut self.client, tx, {
            let mut out = Vec::with_capacity(statements.len());
            for stmt in &statements {
                out.extend(stmt.fetch_all_with(&tx, logger).await?);
            }
            Ok(out)
        });
        if let Err(e) = &result {
            warn_rollback(table, statements.len(), e);
        }
        result
    }

    fn build_inserts<I>(&self, table: &str, rows: I, returning: &[&str]) -> DbResult<Vec<Statement>>
    where
        I: IntoIterator<Item = RowMap>,
    {
        rows.into_iter()
            .map(|row| {
                InsertStatement::new(table, row)
                    .returning(returning.iter().copied())
                    .build(&self.schema)
            })
            .collect()
    }

    /// `UPDATE table SET ... WHERE ...`; returns the affected row count.
    pub async fn update(&self, table: &str, set: RowMap, filters: FilterMap) -> DbResult<u64> {
        let stmt = UpdateStatement::new(table, set)
            .filters(filters)
            .build(&self.schema)?;
        stmt.execute_with(&self.client, &self.logger).await
    }

    /// `DELETE FROM table WHERE ...`; filters are mandatory.
    pub async fn delete(&self, table: &str, filters: FilterMap) -> DbResult<u64> {
        let stmt = DeleteStatement::new(table, filters).build(&self.schema)?;
        stmt.execute_with(&self.client, &self.logger).await
    }

    pub async fn select(&self, select: &SelectStatement) -> DbResult<Vec<RowMap>> {
        let stmt = select.build(&self.schema)?;
        stmt.fetch_all_with(&self.client, &self.logger).await
    }

    /// Every row of `table` (`SELECT * FROM table`).
    pub async fn select_table(&self, table: &str) -> DbResult<Vec<RowMap>> {
        self.select(&SelectStatement::new(table)).await
    }

    /// Run caller-supplied SQL and return the affected row count.
    pub async fn execute_raw(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        Statement::raw(sql, params.to_vec())
            .execute_with(&self.client, &self.logger)
            .await
    }

    /// Run a caller-supplied query and return its rows.
    pub async fn query_raw(&self, sql: &str, params: &[Value]) -> DbResult<Vec<RowMap>> {
        Statement::raw(sql, params.to_vec())
            .fetch_all_with(&self.client, &self.logger)
            .await
    }

    /// Re-introspect the configured schemas and swap in the new cache.
    pub async fn reload_schema(&mut self) -> DbResult<()> {
        let schema = self.schema.reload(&self.client).await?;
        tracing::info!(
            target: "tablekit",
            tables = schema.tables.len(),
            changed = schema.fingerprint != self.schema.fingerprint,
            "schema reloaded"
        );
        self.schema = schema;
        Ok(())
    }

    /// Whether the catalog changed since the cache was loaded.
    pub async fn is_schema_stale(&self) -> DbResult<bool> {
        self.schema.is_stale(&self.client).await
    }

    /// `CREATE TABLE IF NOT EXISTS` for `def`, then reload the schema.
    pub async fn apply_table(&mut self, def: &TableDef) -> DbResult<()> {
        self.apply_tables(std::slice::from_ref(def)).await
    }

    /// Apply several table definitions, reloading the schema once at the end.
    pub async fn apply_tables(&mut self, defs: &[TableDef]) -> DbResult<()> {
        for def in defs {
            if let Some(schema) = &def.schema {
                if !self.config.schemas.contains(schema) {
                    tracing::warn!(
                        target: "tablekit.schema",
                        table = %def.name,
                        schema = %schema,
                        "table is created outside the configured schemas and will not be visible"
                    );
                }
            }
            // Unqualified definitions go to the first configured schema, not
            // wherever the server's search_path points.
            let stmt = match (&def.schema, self.config.schemas.first()) {
                (None, Some(schema)) => def.clone().in_schema(schema.as_str()).create_table_sql()?,
                _ => def.create_table_sql()?,
            };
            self.run_ddl(&stmt).await?;
        }
        self.reload_schema().await
    }

    /// `ALTER TABLE ... ADD COLUMN IF NOT EXISTS` for each column, then reload the schema.
    pub async fn add_columns(&mut self, table: &str, columns: &[ColumnDef]) -> DbResult<()> {
        let stmt = add_columns_sql(self.schema.table(table)?, columns)?;
        self.run_ddl(&stmt).await?;
        self.reload_schema().await
    }

    async fn run_ddl(&self, stmt: &Statement) -> DbResult<()> {
        self.logger.before(stmt);
        let started = Instant::now();
        let result = GenericClient::batch_execute(&self.client, stmt.sql()).await;
        self.logger
            .after(stmt, started.elapsed(), result.as_ref().map(|_| 0));
        result
    }

    /// Drop the client and wait for the connection task to finish.
    pub async fn close(self) -> DbResult<()> {
        let Database {
            client, connection, ..
        } = self;
        drop(client);
        connection.join().await
    }
}

fn warn_rollback(table: &str, rows: usize, error: &DbError) {
    tracing::warn!(
        target: "tablekit.sql",
        table,
        rows,
        code = error.code(),
        error = %error,
        "insert batch rolled back"
    );
}
