use super::scope::Scope;
use super::writer::SqlWriter;
use super::{Statement, StatementKind};
use crate::error::DbResult;
use crate::row::RowMap;
use crate::schema::SchemaCache;

/// `INSERT INTO <table> (<cols>) VALUES ($1, ...)` for a single row.
///
/// Parameters follow the order of the row's columns. An empty row renders
/// `DEFAULT VALUES`.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    table: String,
    row: RowMap,
    returning: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>, row: RowMap) -> Self {
        Self {
            table: table.into(),
            row,
            returning: Vec::new(),
        }
    }

    /// Add a `RETURNING` clause with the given columns.
    pub fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returning = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(&self, schema: &SchemaCache) -> DbResult<Statement> {
        let table = schema.table(&self.table)?;
        let scope = Scope::new(table);

        let mut w = SqlWriter::new("INSERT INTO ");
        w.push_table(table);

        if self.row.is_empty() {
            w.push(" DEFAULT VALUES");
        } else {
            let mut columns = Vec::with_capacity(self.row.len());
            for (name, value) in self.row.iter() {
                let column = table.require_column(name)?;
                table.check_value(column, value)?;
                columns.push((column, value));
            }

            w.push(" (");
            for (i, (column, _)) in columns.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_ident(&column.name);
            }
            w.push(") VALUES (");
            for (i, (_, value)) in columns.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_bind((*value).clone());
            }
            w.push(")");
        }

        if !self.returning.is_empty() {
            w.push(" RETURNING ");
            for (i, name) in self.returning.iter().enumerate() {
                let (t, column) = scope.resolve(name)?;
                if i > 0 {
                    w.push(", ");
                }
                scope.push_column(&mut w, t, column);
            }
        }

        Ok(w.finish(StatementKind::Insert, table))
    }
}
