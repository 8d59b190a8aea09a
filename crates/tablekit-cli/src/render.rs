use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use tablekit::{RowMap, TableInfo, Value};

fn header(names: impl IntoIterator<Item = impl Into<String>>) -> Vec<Cell> {
    names
        .into_iter()
        .map(|n| {
            Cell::new(n.into())
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        })
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Text shown for a single value in a result grid.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "(null)".to_string(),
        v => v.to_string(),
    }
}

/// Result rows as a grid. Column order follows the first row.
pub fn rows_table(rows: &[RowMap]) -> Table {
    let mut table = new_table();
    let Some(first) = rows.first() else {
        return table;
    };

    let columns: Vec<&str> = first.columns().collect();
    table.set_header(header(columns.iter().copied()));

    for row in rows {
        table.add_row(columns.iter().map(|c| match row.get(c) {
            Some(Value::Null) | None => Cell::new("(null)").fg(Color::DarkGrey),
            Some(v) => Cell::new(display_value(v)),
        }));
    }

    table
}

pub fn columns_table(table_info: &TableInfo) -> Table {
    let mut table = new_table();
    table.set_header(header(["column", "type", "not null", "default", "pk"]));

    for col in &table_info.columns {
        table.add_row(vec![
            Cell::new(&col.name).fg(Color::Yellow),
            Cell::new(&col.data_type),
            Cell::new(if col.not_null { "yes" } else { "" }),
            Cell::new(col.default_expr.as_deref().unwrap_or("")).fg(Color::DarkGrey),
            Cell::new(if col.primary_key { "yes" } else { "" }).fg(Color::Magenta),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablekit::{ColumnInfo, row};

    #[test]
    fn null_and_bytes_display() {
        assert_eq!(display_value(&Value::Null), "(null)");
        assert_eq!(display_value(&Value::Bytes(vec![0xde, 0xad])), "\\xdead");
        assert_eq!(display_value(&Value::Int(7)), "7");
    }

    #[test]
    fn non_null_values_display_like_value() {
        let values = [
            Value::Float(2.5),
            Value::Bool(true),
            Value::from(serde_json::json!({"a": [1, 2]})),
            Value::Array(vec![Value::from("x"), Value::Null]),
        ];
        for v in &values {
            assert_eq!(display_value(v), v.to_string());
        }
        assert_eq!(display_value(&values[3]), "{x,NULL}");
    }

    #[test]
    fn rows_render_in_first_row_order() {
        let rows = vec![
            row! { "id" => 1i64, "name" => "ada" },
            row! { "id" => 2i64, "name" => Value::Null },
        ];
        let out = rows_table(&rows).to_string();
        assert!(out.find("id").unwrap() < out.find("name").unwrap());
        assert!(out.contains("ada"));
        assert!(out.contains("(null)"));
    }

    #[test]
    fn empty_result_has_no_header() {
        assert_eq!(rows_table(&[]).row_count(), 0);
    }

    #[test]
    fn columns_table_lists_every_column() {
        let info = TableInfo::new(
            "public",
            "users",
            vec![
                ColumnInfo::new("id", "bigint").primary_key(),
                ColumnInfo::new("email", "text"),
            ],
        );
        let t = columns_table(&info);
        assert_eq!(t.row_count(), 2);
        let out = t.to_string();
        assert!(out.contains("email"));
        assert!(out.contains("bigint"));
    }
}
