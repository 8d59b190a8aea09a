use super::scope::Scope;
use super::writer::SqlWriter;
use super::{Statement, StatementKind};
use crate::error::{DbError, DbResult};
use crate::filter::FilterMap;
use crate::schema::SchemaCache;

/// `DELETE FROM <table> WHERE ...`.
///
/// At least one filter is required; there is no way to build an
/// unconditional delete.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    table: String,
    filters: FilterMap,
}

impl DeleteStatement {
    pub fn new(table: impl Into<String>, filters: FilterMap) -> Self {
        Self {
            table: table.into(),
            filters,
        }
    }

    pub fn build(&self, schema: &SchemaCache) -> DbResult<Statement> {
        let table = schema.table(&self.table)?;
        if self.filters.is_empty() {
            return Err(DbError::validation(format!(
                "DELETE FROM {} requires at least one filter",
                table.qualified_name()
            )));
        }

        let mut w = SqlWriter::new("DELETE FROM ");
        w.push_table(table);
        Scope::new(table).push_where(&mut w, &self.filters)?;

        Ok(w.finish(StatementKind::Delete, table))
    }
}
