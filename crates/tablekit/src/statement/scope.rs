use super::writer::SqlWriter;
use crate::error::{DbError, DbResult};
use crate::filter::{Filter, FilterMap};
use crate::ident::Ident;
use crate::schema::{ColumnInfo, TableInfo};

/// The tables visible to one statement, in FROM/JOIN order.
///
/// Single-table scopes render bare column names; once a join is added,
/// every column is rendered as `table.column`.
pub(crate) struct Scope<'a> {
    tables: Vec<&'a TableInfo>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(base: &'a TableInfo) -> Self {
        Self { tables: vec![base] }
    }

    pub(crate) fn base(&self) -> &'a TableInfo {
        self.tables[0]
    }

    pub(crate) fn qualify(&self) -> bool {
        self.tables.len() > 1
    }

    /// Columns are qualified by relation name alone, so two tables sharing a
    /// name (even in different schemas) cannot both be in scope.
    pub(crate) fn add(&mut self, table: &'a TableInfo) -> DbResult<()> {
        if let Some(existing) = self.tables.iter().find(|t| t.name == table.name) {
            return Err(DbError::validation(format!(
                "table {} clashes with {} already in the query; both are referenced as `{}`",
                table.qualified_name(),
                existing.qualified_name(),
                table.name
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Resolve `column`, `table.column` or `schema.table.column`.
    ///
    /// A name that is exactly a catalog column (`first name`, `Email`) is
    /// taken as is, matching how row mappings name columns. Anything else
    /// is parsed as a dotted, possibly quoted, identifier.
    pub(crate) fn resolve(&self, name: &str) -> DbResult<(&'a TableInfo, &'a ColumnInfo)> {
        if let Some(hit) = self.unique_column(name)? {
            return Ok(hit);
        }

        let ident = Ident::parse(name)
            .map_err(|_| DbError::unknown_column(self.base().qualified_name(), name))?;

        match ident.parts.as_slice() {
            [column] => self
                .unique_column(column)?
                .ok_or_else(|| DbError::unknown_column(self.base().qualified_name(), column)),
            [table, column] => {
                let t = self.find(None, table)?;
                Ok((t, t.require_column(column)?))
            }
            [schema, table, column] => {
                let t = self.find(Some(schema.as_str()), table)?;
                Ok((t, t.require_column(column)?))
            }
            _ => Err(DbError::unknown_column(self.base().qualified_name(), name)),
        }
    }

    /// The single table in scope owning `column`; an error when several do.
    fn unique_column(&self, column: &str) -> DbResult<Option<(&'a TableInfo, &'a ColumnInfo)>> {
        let mut hits = self
            .tables
            .iter()
            .copied()
            .filter_map(|t| t.column(column).map(|c| (t, c)));
        let Some(first) = hits.next() else {
            return Ok(None);
        };
        if hits.next().is_some() {
            return Err(DbError::validation(format!(
                "column reference \"{column}\" is ambiguous; qualify it with a table name"
            )));
        }
        Ok(Some(first))
    }

    fn find(&self, schema: Option<&str>, table: &str) -> DbResult<&'a TableInfo> {
        self.tables
            .iter()
            .copied()
            .find(|t| t.name == table && schema.is_none_or(|s| t.schema == s))
            .ok_or_else(|| match schema {
                Some(s) => DbError::unknown_table(format!("{s}.{table}")),
                None => DbError::unknown_table(table),
            })
    }

    pub(crate) fn push_column(&self, w: &mut SqlWriter, table: &TableInfo, column: &ColumnInfo) {
        w.push_column(table, &column.name, self.qualify());
    }

    /// Append ` WHERE p1 AND p2 ...` for `filters`; nothing when empty.
    pub(crate) fn push_where(&self, w: &mut SqlWriter, filters: &FilterMap) -> DbResult<()> {
        for (i, (name, filter)) in filters.iter().enumerate() {
            let (table, column) = self.resolve(name)?;
            w.push(if i == 0 { " WHERE " } else { " AND " });
            self.push_column(w, table, column);
            match filter {
                Filter::Equals(value) => {
                    if value.is_null() {
                        return Err(DbError::validation(format!(
                            "`{name} = NULL` never matches; use Filter::IsNull"
                        )));
                    }
                    table.check_value(column, value)?;
                    w.push(" = ").push_bind(value.clone());
                }
                Filter::Raw(expr) => {
                    let expr = expr.trim();
                    if expr.is_empty() {
                        return Err(DbError::validation(format!(
                            "raw filter for `{name}` is empty"
                        )));
                    }
                    w.push(" ").push(expr);
                }
                Filter::IsNull => {
                    w.push(" IS NULL");
                }
                Filter::IsNotNull => {
                    w.push(" IS NOT NULL");
                }
            }
        }
        Ok(())
    }
}
