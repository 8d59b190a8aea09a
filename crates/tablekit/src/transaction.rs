//! Scoped transactions.
//!
//! Pass the transaction into anything that accepts a
//! [`GenericClient`](crate::GenericClient) so the same code runs with or
//! without one.
//!
//! # Example
//!
//! ```ignore
//! use tablekit::{row, DbResult, InsertStatement};
//!
//! # async fn demo(client: &mut tokio_postgres::Client, schema: &tablekit::SchemaCache) -> DbResult<()> {
//! tablekit::transaction!(client, tx, {
//!     InsertStatement::new("users", row! { "name" => "a" })
//!         .build(schema)?
//!         .execute(&tx)
//!         .await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`; a failed rollback is reported together with
///   the original error.
///
/// The block must evaluate to `tablekit::DbResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::DbError::from_db_error)?;

        let __tablekit_tx_body_result = async { $body }.await;
        match __tablekit_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::DbError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::DbError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
