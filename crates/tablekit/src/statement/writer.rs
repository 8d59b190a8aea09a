use super::{Statement, StatementKind};
use crate::ident::write_ident;
use crate::schema::TableInfo;
use crate::value::Value;
use std::fmt::Write;

/// Accumulates SQL text and bound values; placeholders are numbered as
/// values are pushed.
pub(crate) struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new(initial_sql: &str) -> Self {
        Self {
            sql: initial_sql.to_string(),
            params: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append `$n` and bind `value` to it.
    pub(crate) fn push_bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        // Writing to a String cannot fail.
        let _ = write!(self.sql, "${}", self.params.len());
        self
    }

    pub(crate) fn push_ident(&mut self, name: &str) -> &mut Self {
        write_ident(&mut self.sql, name);
        self
    }

    pub(crate) fn push_table(&mut self, table: &TableInfo) -> &mut Self {
        table.write_sql_name(&mut self.sql);
        self
    }

    /// `table.column`, or bare `column` when `qualify` is false.
    ///
    /// The qualifier is the relation name alone, which is how the FROM item
    /// `schema.table` is referenced.
    pub(crate) fn push_column(&mut self, table: &TableInfo, column: &str, qualify: bool) -> &mut Self {
        if qualify {
            self.push_ident(&table.name).push(".");
        }
        self.push_ident(column)
    }

    pub(crate) fn finish(self, kind: StatementKind, table: &TableInfo) -> Statement {
        let tag = format!("{kind}.{}", table.qualified_name());
        Statement::new(kind, self.sql, self.params, tag)
    }
}
