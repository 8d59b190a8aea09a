//! Generic client trait for unified database access.

use crate::error::{DbError, DbResult};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Statement execution is written against this trait so the same code runs
/// on the owned connection or inside a transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Returns `DbError::NotFound` if no rows are returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Row>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| DbError::NotFound("Expected one row, got none".to_string()))
        }
    }

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Execute one or more statements without parameters (DDL, `CREATE DATABASE`, ...).
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = DbResult<()>> + Send;
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(DbError::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        tokio_postgres::Transaction::batch_execute(self, sql)
            .await
            .map_err(DbError::from_db_error)
    }
}
