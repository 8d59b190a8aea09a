use super::scope::Scope;
use super::writer::SqlWriter;
use super::{Statement, StatementKind};
use crate::error::{DbError, DbResult};
use crate::filter::FilterMap;
use crate::schema::{ColumnInfo, SchemaCache, TableInfo};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => " JOIN ",
            JoinKind::Left => " LEFT JOIN ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// `JOIN <table> ON <left> = <right>`.
///
/// Both sides are column references (`table.column`) resolved against the
/// tables joined so far, and at least one of them must belong to `table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone)]
enum Projection {
    Column(String),
    Expr(String),
}

/// `SELECT ... FROM <table> [JOIN ...] [WHERE ...] [ORDER BY ...] [LIMIT n] [OFFSET n]`.
///
/// With no refinement this renders `SELECT * FROM <table>`.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    table: String,
    joins: Vec<Join>,
    projection: Vec<Projection>,
    filters: FilterMap,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            projection: Vec::new(),
            filters: FilterMap::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Project a column (`name` or `table.name`).
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.projection.push(Projection::Column(name.into()));
        self
    }

    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection
            .extend(names.into_iter().map(|n| Projection::Column(n.into())));
        self
    }

    /// Project a trusted SQL expression verbatim (e.g. `count(*)`).
    ///
    /// The expression is not checked against the schema and must never be
    /// built from external input.
    pub fn column_expr(mut self, expr: impl Into<String>) -> Self {
        self.projection.push(Projection::Expr(expr.into()));
        self
    }

    /// Inner join on `left = right`.
    pub fn join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push_join(JoinKind::Inner, table.into(), left.into(), right.into())
    }

    pub fn left_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.push_join(JoinKind::Left, table.into(), left.into(), right.into())
    }

    fn push_join(mut self, kind: JoinKind, table: String, left: String, right: String) -> Self {
        self.joins.push(Join {
            kind,
            table,
            left,
            right,
        });
        self
    }

    pub fn filters(mut self, filters: FilterMap) -> Self {
        self.filters = filters;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Whether anything beyond the bare table was requested.
    pub fn is_refined(&self) -> bool {
        !self.joins.is_empty()
            || !self.projection.is_empty()
            || !self.filters.is_empty()
            || !self.order_by.is_empty()
            || self.limit.is_some()
            || self.offset.is_some()
    }

    pub fn build(&self, schema: &SchemaCache) -> DbResult<Statement> {
        let base = schema.table(&self.table)?;
        let mut scope = Scope::new(base);

        let mut joins: Vec<(JoinKind, &TableInfo, ResolvedColumn<'_>, ResolvedColumn<'_>)> =
            Vec::with_capacity(self.joins.len());
        for join in &self.joins {
            let table = schema.table(&join.table)?;
            scope.add(table)?;
            let left = scope.resolve(&join.left)?;
            let right = scope.resolve(&join.right)?;
            if !std::ptr::eq(left.0, table) && !std::ptr::eq(right.0, table) {
                return Err(DbError::validation(format!(
                    "join condition {} = {} does not reference {}",
                    join.left,
                    join.right,
                    table.qualified_name()
                )));
            }
            joins.push((join.kind, table, left, right));
        }

        let mut w = SqlWriter::new("SELECT ");
        if self.projection.is_empty() {
            w.push("*");
        } else {
            for (i, item) in self.projection.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                match item {
                    Projection::Column(name) => {
                        let (t, c) = scope.resolve(name)?;
                        scope.push_column(&mut w, t, c);
                    }
                    Projection::Expr(expr) => {
                        let expr = expr.trim();
                        if expr.is_empty() {
                            return Err(DbError::validation("empty projection expression"));
                        }
                        w.push(expr);
                    }
                }
            }
        }

        w.push(" FROM ").push_table(base);
        for (kind, table, (lt, lc), (rt, rc)) in &joins {
            w.push(kind.keyword()).push_table(table).push(" ON ");
            scope.push_column(&mut w, lt, lc);
            w.push(" = ");
            scope.push_column(&mut w, rt, rc);
        }

        scope.push_where(&mut w, &self.filters)?;

        for (i, (name, order)) in self.order_by.iter().enumerate() {
            let (t, c) = scope.resolve(name)?;
            w.push(if i == 0 { " ORDER BY " } else { ", " });
            scope.push_column(&mut w, t, c);
            if *order == SortOrder::Desc {
                w.push(" DESC");
            }
        }

        let mut tail = String::new();
        if let Some(limit) = self.limit {
            let _ = write!(tail, " LIMIT {limit}");
        }
        if let Some(offset) = self.offset {
            let _ = write!(tail, " OFFSET {offset}");
        }
        w.push(&tail);

        Ok(w.finish(StatementKind::Select, base))
    }
}

type ResolvedColumn<'a> = (&'a TableInfo, &'a ColumnInfo);
