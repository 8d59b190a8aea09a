use super::scope::Scope;
use super::writer::SqlWriter;
use super::{Statement, StatementKind};
use crate::error::{DbError, DbResult};
use crate::filter::FilterMap;
use crate::row::RowMap;
use crate::schema::SchemaCache;

/// `UPDATE <table> SET a = $1, ... [WHERE ...]`.
///
/// Filter placeholders continue numbering after the SET values.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table: String,
    set: RowMap,
    filters: FilterMap,
}

impl UpdateStatement {
    pub fn new(table: impl Into<String>, set: RowMap) -> Self {
        Self {
            table: table.into(),
            set,
            filters: FilterMap::new(),
        }
    }

    pub fn filters(mut self, filters: FilterMap) -> Self {
        self.filters = filters;
        self
    }

    pub fn build(&self, schema: &SchemaCache) -> DbResult<Statement> {
        let table = schema.table(&self.table)?;
        if self.set.is_empty() {
            return Err(DbError::validation(format!(
                "UPDATE {} has no columns to set",
                table.qualified_name()
            )));
        }
        let scope = Scope::new(table);

        let mut w = SqlWriter::new("UPDATE ");
        w.push_table(table).push(" SET ");
        for (i, (name, value)) in self.set.iter().enumerate() {
            let column = table.require_column(name)?;
            table.check_value(column, value)?;
            if i > 0 {
                w.push(", ");
            }
            w.push_ident(&column.name).push(" = ").push_bind(value.clone());
        }

        scope.push_where(&mut w, &self.filters)?;

        Ok(w.finish(StatementKind::Update, table))
    }
}
