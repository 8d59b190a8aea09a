//! Ordered row mappings.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio_postgres::Row;

/// An ordered mapping from column name to [`Value`].
///
/// This is both the input of insert/update and the output of select. Column
/// order is insertion order; re-inserting a column replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    entries: Vec<(String, Value)>,
}

impl RowMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Set a column value, returning the previous value if the column was present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((column, value));
                None
            }
        }
    }

    /// Chainable form of [`RowMap::insert`].
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Decode a driver row into a mapping, keeping the result column order.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        let mut out = Self::with_capacity(row.len());
        for (idx, col) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| DbError::decode(col.name(), e.to_string()))?;
            // Joined selects may repeat a name; keep each occurrence.
            out.entries.push((col.name().to_string(), value));
        }
        Ok(out)
    }

    /// Whether every column of `other` is present here with an equal value.
    pub fn contains_all(&self, other: &RowMap) -> bool {
        other.iter().all(|(c, v)| self.get(c) == Some(v))
    }
}

impl<K, V> FromIterator<(K, V)> for RowMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = RowMap::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

impl IntoIterator for RowMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for RowMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (c, v) in &self.entries {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

/// Build a [`RowMap`] from `column => value` pairs.
///
/// ```ignore
/// let row = tablekit::row! { "name" => "alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::RowMap::new() };
    ($($col:expr => $val:expr),+ $(,)?) => {{
        let mut __tablekit_row = $crate::RowMap::new();
        $( __tablekit_row.insert($col, $val); )+
        __tablekit_row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let row = RowMap::new().set("b", 1).set("a", 2).set("c", 3);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut row = RowMap::new().set("a", 1).set("b", 2);
        let old = row.insert("a", 10);
        assert_eq!(old, Some(Value::Int(1)));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn remove_and_contains() {
        let mut row = RowMap::new().set("a", 1).set("b", "x");
        assert!(row.contains("b"));
        assert_eq!(row.remove("b"), Some(Value::Text("x".into())));
        assert!(!row.contains("b"));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn contains_all_is_subset_check() {
        let full = RowMap::new().set("id", 1).set("name", "a").set("age", 3);
        let part = RowMap::new().set("name", "a").set("id", 1);
        assert!(full.contains_all(&part));
        assert!(!part.contains_all(&full));
    }

    #[test]
    fn row_macro_and_serialize() {
        let row = crate::row! { "name" => "alice", "age" => 30, "nick" => None::<String> };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"name":"alice","age":30,"nick":null}"#);
    }
}
