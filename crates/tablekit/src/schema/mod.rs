//! In-memory schema cache.
//!
//! The cache is loaded once when a [`Database`](crate::Database) opens and is
//! the allow-list every statement builder resolves identifiers against.
//! It is immutable; [`SchemaCache::reload`] produces a fresh instance.

mod introspect;

#[cfg(test)]
pub(crate) mod tests;

pub use introspect::{load_schema, schema_fingerprint};

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::ident::{Ident, write_ident};
use crate::value::{TypeFamily, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    ForeignTable,
    Other,
}

impl RelationKind {
    fn from_relkind(relkind: i8) -> Self {
        // `relkind` is a "char" column; tokio-postgres exposes it as i8.
        match relkind as u8 as char {
            'r' => Self::Table,
            'p' => Self::PartitionedTable,
            'v' => Self::View,
            'm' => Self::MaterializedView,
            'f' => Self::ForeignTable,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as rendered by `format_type` (e.g. `character varying(64)`).
    pub data_type: String,
    pub not_null: bool,
    pub default_expr: Option<String>,
    pub ordinal: i32,
    pub primary_key: bool,
}

impl ColumnInfo {
    /// Shorthand used by tests and fixtures.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            not_null: false,
            default_expr: None,
            ordinal: 0,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn family(&self) -> TypeFamily {
        TypeFamily::from_declared(&self.data_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub kind: RelationKind,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        let mut columns = columns;
        for (i, col) in columns.iter_mut().enumerate() {
            if col.ordinal == 0 {
                col.ordinal = i as i32 + 1;
            }
        }
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: RelationKind::Table,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with `UnknownColumn`.
    pub fn require_column(&self, name: &str) -> DbResult<&ColumnInfo> {
        self.column(name)
            .ok_or_else(|| DbError::unknown_column(self.qualified_name(), name))
    }

    /// Primary key columns in ordinal order.
    pub fn primary_key(&self) -> Vec<&ColumnInfo> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// `schema.name` as plain text (for messages).
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Name as it should appear in SQL, always schema-qualified so the
    /// server's `search_path` cannot redirect it to another relation.
    pub fn sql_name(&self) -> String {
        let mut out = String::new();
        self.write_sql_name(&mut out);
        out
    }

    pub(crate) fn write_sql_name(&self, out: &mut String) {
        write_ident(out, &self.schema);
        out.push('.');
        write_ident(out, &self.name);
    }

    /// Check that `value` can bind to `column`, failing with `ValueType`.
    pub fn check_value(&self, column: &ColumnInfo, value: &Value) -> DbResult<()> {
        if column.family().accepts(value) {
            Ok(())
        } else {
            Err(DbError::ValueType {
                table: self.qualified_name(),
                column: column.name.clone(),
                expected: column.data_type.clone(),
                found: value.kind().to_string(),
            })
        }
    }
}

/// Introspected table metadata for a set of PostgreSQL schemas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCache {
    /// Schemas searched, in resolution order for unqualified names.
    pub schemas: Vec<String>,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub tables: Vec<TableInfo>,
}

impl SchemaCache {
    /// Build a cache from already-known tables (no database round trip).
    pub fn from_tables(schemas: Vec<String>, tables: Vec<TableInfo>) -> Self {
        Self {
            schemas,
            fingerprint: String::new(),
            loaded_at: Utc::now(),
            tables,
        }
    }

    /// Introspect the given schemas.
    pub async fn load<C: GenericClient>(client: &C, schemas: &[String]) -> DbResult<Self> {
        let (tables, fingerprint) = load_schema(client, schemas).await?;
        tracing::info!(
            target: "tablekit.schema",
            tables = tables.len(),
            schemas = ?schemas,
            "schema cache loaded"
        );
        Ok(Self {
            schemas: schemas.to_vec(),
            fingerprint,
            loaded_at: Utc::now(),
            tables,
        })
    }

    /// Re-run introspection for the same schemas and return a fresh cache.
    pub async fn reload<C: GenericClient>(&self, client: &C) -> DbResult<Self> {
        Self::load(client, &self.schemas).await
    }

    /// Whether the live catalog differs from what this cache was built from.
    pub async fn is_stale<C: GenericClient>(&self, client: &C) -> DbResult<bool> {
        let current = schema_fingerprint(client, &self.schemas).await?;
        Ok(current != self.fingerprint)
    }

    /// Resolve a table by `name` or `schema.name`.
    ///
    /// An exact catalog name wins; otherwise `name` is parsed as a (possibly
    /// quoted) identifier. Unqualified names are searched through `schemas`
    /// in order.
    pub fn table(&self, name: &str) -> DbResult<&TableInfo> {
        if let Some(t) = self.schemas.iter().find_map(|schema| self.find(schema, name)) {
            return Ok(t);
        }
        let ident = Ident::parse(name).map_err(|_| DbError::unknown_table(name))?;
        let found = match ident.parts.as_slice() {
            [table] => self.schemas.iter().find_map(|schema| self.find(schema, table)),
            [schema, table] => self.find(schema, table),
            _ => None,
        };
        found.ok_or_else(|| DbError::unknown_table(name))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_ok()
    }

    /// Resolve `table.column`.
    pub fn column(&self, table: &str, column: &str) -> DbResult<&ColumnInfo> {
        self.table(table)?.require_column(column)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| {
                if t.schema == "public" {
                    t.name.clone()
                } else {
                    t.qualified_name()
                }
            })
            .collect()
    }

    /// Table name → column name → declared type.
    pub fn column_types(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.tables
            .iter()
            .map(|t| {
                let cols = t
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data_type.clone()))
                    .collect();
                (t.qualified_name(), cols)
            })
            .collect()
    }

    fn find(&self, schema: &str, table: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == table)
    }
}
