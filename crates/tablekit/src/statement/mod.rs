//! Schema-checked statement builders.
//!
//! Every builder resolves its table and columns against a [`SchemaCache`]
//! before producing a [`Statement`]; unknown names and mistyped values are
//! reported here and never reach the server. Values are always bound as
//! `$n` parameters and identifiers are quoted when PostgreSQL requires it.
//!
//! # Example
//! ```ignore
//! use tablekit::{row, FilterMap, UpdateStatement};
//!
//! let stmt = UpdateStatement::new("users", row! { "name" => "alice" })
//!     .filters(FilterMap::new().eq("id", 7).is_not_null("email"))
//!     .build(&schema)?;
//! assert_eq!(stmt.sql(), "UPDATE public.users SET name = $1 WHERE id = $2 AND email IS NOT NULL");
//! ```

mod delete;
mod insert;
mod scope;
mod select;
mod update;
mod writer;


pub use delete::DeleteStatement;
pub use insert::InsertStatement;
pub use select::{Join, JoinKind, SelectStatement, SortOrder};
pub use update::UpdateStatement;

use crate::client::GenericClient;
use crate::error::DbResult;
use crate::monitor::SqlLogger;
use crate::row::RowMap;
use crate::value::Value;
use std::fmt;
use std::time::Instant;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// The kind of SQL a [`Statement`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Caller-supplied SQL (DDL, raw queries).
    Raw,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Raw => "raw",
        })
    }
}

/// A rendered statement: SQL text with `$1..$n` placeholders plus the
/// parameters bound to them, in order.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    sql: String,
    params: Vec<Value>,
    tag: Option<String>,
}

impl Statement {
    /// Wrap caller-supplied SQL. Nothing is checked against the schema.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            kind: StatementKind::Raw,
            sql: sql.into(),
            params,
            tag: None,
        }
    }

    pub(crate) fn new(kind: StatementKind, sql: String, params: Vec<Value>, tag: String) -> Self {
        Self {
            kind,
            sql,
            params,
            tag: Some(tag),
        }
    }

    /// Override the tag reported in SQL logs.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// Parameters in the form `tokio-postgres` expects.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }

    /// Execute and return the number of affected rows.
    pub async fn execute<C: GenericClient>(&self, conn: &C) -> DbResult<u64> {
        self.execute_with(conn, &SqlLogger::default()).await
    }

    /// Execute and return every row as a [`RowMap`].
    pub async fn fetch_all<C: GenericClient>(&self, conn: &C) -> DbResult<Vec<RowMap>> {
        self.fetch_all_with(conn, &SqlLogger::default()).await
    }

    /// Execute and return the raw driver rows.
    pub async fn fetch_rows<C: GenericClient>(&self, conn: &C) -> DbResult<Vec<Row>> {
        self.fetch_rows_with(conn, &SqlLogger::default()).await
    }

    pub(crate) async fn execute_with<C: GenericClient>(
        &self,
        conn: &C,
        logger: &SqlLogger,
    ) -> DbResult<u64> {
        logger.before(self);
        let started = Instant::now();
        let result = conn.execute(&self.sql, &self.params_ref()).await;
        logger.after(self, started.elapsed(), result.as_ref().map(|n| *n));
        result
    }

    pub(crate) async fn fetch_rows_with<C: GenericClient>(
        &self,
        conn: &C,
        logger: &SqlLogger,
    ) -> DbResult<Vec<Row>> {
        logger.before(self);
        let started = Instant::now();
        let result = conn.query(&self.sql, &self.params_ref()).await;
        logger.after(
            self,
            started.elapsed(),
            result.as_ref().map(|rows| rows.len() as u64),
        );
        result
    }

    pub(crate) async fn fetch_all_with<C: GenericClient>(
        &self,
        conn: &C,
        logger: &SqlLogger,
    ) -> DbResult<Vec<RowMap>> {
        let rows = self.fetch_rows_with(conn, logger).await?;
        rows.iter().map(RowMap::from_row).collect()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
