use crate::cli::SelectArgs;
use crate::render;
use tablekit::{Filter, FilterMap, SchemaCache, SelectStatement};

pub async fn run(args: SelectArgs) -> anyhow::Result<()> {
    let (db, _) = crate::config::connect(&args.conn).await?;

    let filters = build_filters(db.schema(), &args.table, &args.filters)?;
    let mut select = SelectStatement::new(args.table.as_str())
        .columns(args.columns.iter().map(String::as_str))
        .filters(filters);
    if let Some(limit) = args.limit {
        select = select.limit(limit);
    }

    let rows = db.select(&select).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("(0 rows)");
    } else {
        println!("{}", render::rows_table(&rows));
        println!("({} row(s))", rows.len());
    }

    db.close().await?;
    Ok(())
}

/// `--where col=value` pairs as equality filters, each literal parsed by
/// the column's type family. `NULL` becomes `IS NULL`.
fn build_filters(
    schema: &SchemaCache,
    table: &str,
    pairs: &[(String, String)],
) -> anyhow::Result<FilterMap> {
    let mut filters = FilterMap::new();
    for (column, literal) in pairs {
        let info = schema.column(table, column)?;
        let filter = if literal.eq_ignore_ascii_case("null") {
            Filter::IsNull
        } else {
            let value = info.family().parse_literal(literal).map_err(|e| {
                anyhow::anyhow!("invalid --where value for {column}: {e}")
            })?;
            Filter::Equals(value)
        };
        filters.insert(column.as_str(), filter);
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablekit::{ColumnInfo, DbError, TableInfo, Value};

    fn schema() -> SchemaCache {
        SchemaCache::from_tables(
            vec!["public".to_string()],
            vec![TableInfo::new(
                "public",
                "hosts",
                vec![
                    ColumnInfo::new("id", "bigint").primary_key(),
                    ColumnInfo::new("hostname", "text"),
                    ColumnInfo::new("up", "boolean"),
                ],
            )],
        )
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn literals_follow_column_types() {
        let filters = build_filters(
            &schema(),
            "hosts",
            &pairs(&[("id", "42"), ("up", "true"), ("hostname", "db-1")]),
        )
        .unwrap();

        let got: Vec<_> = filters.iter().collect();
        assert_eq!(got[0], ("id", &Filter::Equals(Value::Int(42))));
        assert_eq!(got[1], ("up", &Filter::Equals(Value::Bool(true))));
        assert_eq!(
            got[2],
            ("hostname", &Filter::Equals(Value::Text("db-1".into())))
        );
    }

    #[test]
    fn null_literal_becomes_is_null() {
        let filters = build_filters(&schema(), "hosts", &pairs(&[("hostname", "NULL")])).unwrap();
        assert_eq!(filters.iter().next(), Some(("hostname", &Filter::IsNull)));
    }

    #[test]
    fn bad_literal_and_unknown_column_fail() {
        assert!(build_filters(&schema(), "hosts", &pairs(&[("id", "abc")])).is_err());

        let err = build_filters(&schema(), "hosts", &pairs(&[("nope", "1")])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::UnknownColumn { .. })
        ));
    }
}
