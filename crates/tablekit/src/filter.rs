//! WHERE-clause filters.
//!
//! A [`FilterMap`] is an ordered mapping from column name to [`Filter`].
//! Each entry renders to exactly one predicate and predicates are joined
//! with `AND`.
//!
//! # Example
//! ```ignore
//! use tablekit::{Filter, FilterMap};
//!
//! let filters = FilterMap::new()
//!     .eq("status", "active")
//!     .is_not_null("email")
//!     .raw("age", ">= 18");
//! // status = $1 AND email IS NOT NULL AND age >= 18
//! ```

use crate::value::Value;

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = $n`
    Equals(Value),
    /// `column <expr>`; the fragment is emitted verbatim with no bound parameter.
    ///
    /// The fragment must come from trusted code, never from external input.
    Raw(String),
    /// `column IS NULL`
    IsNull,
    /// `column IS NOT NULL`
    IsNotNull,
}

impl Filter {
    pub fn equals(value: impl Into<Value>) -> Self {
        Filter::Equals(value.into())
    }

    pub fn raw(expr: impl Into<String>) -> Self {
        Filter::Raw(expr.into())
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        Filter::Equals(value)
    }
}

/// Ordered column → [`Filter`] mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterMap {
    entries: Vec<(String, Filter)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the filter for a column.
    pub fn insert(&mut self, column: impl Into<String>, filter: Filter) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = filter,
            None => self.entries.push((column, filter)),
        }
    }

    /// Chainable form of [`FilterMap::insert`].
    pub fn with(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.insert(column, filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, Filter::Equals(value.into()))
    }

    pub fn raw(self, column: impl Into<String>, expr: impl Into<String>) -> Self {
        self.with(column, Filter::Raw(expr.into()))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.with(column, Filter::IsNull)
    }

    pub fn is_not_null(self, column: impl Into<String>) -> Self {
        self.with(column, Filter::IsNotNull)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.entries.iter().map(|(c, f)| (c.as_str(), f))
    }
}

impl<K: Into<String>> FromIterator<(K, Filter)> for FilterMap {
    fn from_iter<I: IntoIterator<Item = (K, Filter)>>(iter: I) -> Self {
        let mut out = FilterMap::new();
        for (k, f) in iter {
            out.insert(k, f);
        }
        out
    }
}
