//! # tablekit
//!
//! A schema-aware SQL statement builder and thin data-access layer for
//! PostgreSQL.
//!
//! ## Features
//!
//! - **Schema allow-list**: table and column names are resolved against an
//!   introspected [`SchemaCache`] before any SQL is rendered
//! - **Always parameterized**: values are bound as `$n`, identifiers are quoted
//! - **Typed filters**: `Equals`, `IsNull`, `IsNotNull`, or a trusted `Raw` fragment
//! - **Explicit joins**: a multi-table select always carries its join predicate
//! - **Atomic batches**: multi-row inserts run in one transaction
//! - **Safe defaults**: DELETE requires filters, UPDATE requires SET
//!
//! ## Example
//!
//! ```ignore
//! use tablekit::{row, Database, DatabaseConfig, FilterMap, SelectStatement};
//!
//! let mut db = Database::connect(&DatabaseConfig::new("postgres://localhost/app")).await?;
//!
//! db.insert("users", [
//!     row! { "name" => "alice", "email" => "alice@example.com" },
//!     row! { "name" => "bob" },
//! ]).await?;
//!
//! db.update(
//!     "users",
//!     row! { "active" => false },
//!     FilterMap::new().eq("name", "bob").is_null("email"),
//! ).await?;
//!
//! let rows = db
//!     .select(&SelectStatement::new("users").columns(["id", "name"]).limit(10))
//!     .await?;
//! db.close().await?;
//! ```

pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod ident;
pub mod monitor;
pub mod row;
pub mod schema;
pub mod statement;
pub mod transaction;
pub mod value;

pub use client::GenericClient;
pub use config::{ColumnDef, DatabaseConfig, TableDef};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use filter::{Filter, FilterMap};
pub use ident::{Ident, quote_ident};
pub use monitor::SqlLogger;
pub use row::RowMap;
pub use schema::{ColumnInfo, RelationKind, SchemaCache, TableInfo};
pub use statement::{
    DeleteStatement, InsertStatement, Join, JoinKind, SelectStatement, SortOrder, Statement,
    StatementKind, UpdateStatement,
};
pub use value::{TypeFamily, Value};
