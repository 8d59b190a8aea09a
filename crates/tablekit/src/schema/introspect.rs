use super::{ColumnInfo, RelationKind, TableInfo};
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;
use tokio_postgres::Row;

fn get<'a, T>(row: &'a Row, column: &str) -> DbResult<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| DbError::decode(column, e.to_string()))
}

/// md5 over every column definition in the selected schemas.
///
/// Changes whenever a relation or column is added, dropped, retyped or
/// gets a new default.
pub async fn schema_fingerprint<C: GenericClient>(
    client: &C,
    schemas: &[String],
) -> DbResult<String> {
    let row = client
        .query_one(
            r#"
SELECT
  md5(
    COALESCE(
      string_agg(
        concat_ws(
          '|',
          n.nspname,
          c.relname,
          c.relkind::text,
          a.attnum::text,
          a.attname,
          pg_catalog.format_type(a.atttypid, a.atttypmod),
          a.attnotnull::text,
          COALESCE(pg_get_expr(ad.adbin, ad.adrelid), '')
        ),
        E'\n' ORDER BY n.nspname, c.relname, a.attnum
      ),
      ''
    )
  ) AS fingerprint
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = c.oid AND ad.adnum = a.attnum
WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
  AND a.attnum > 0
  AND NOT a.attisdropped
  AND n.nspname = ANY($1::text[])
"#,
            &[&schemas],
        )
        .await?;

    get(&row, "fingerprint")
}

/// List every table and view in `schemas` with its columns.
///
/// Returns the tables (ordered by schema, then name) and the catalog fingerprint.
pub async fn load_schema<C: GenericClient>(
    client: &C,
    schemas: &[String],
) -> DbResult<(Vec<TableInfo>, String)> {
    if schemas.is_empty() {
        return Err(DbError::Config("at least one schema is required".to_string()));
    }

    let fingerprint = schema_fingerprint(client, schemas).await?;

    let rows = client
        .query(
            r#"
SELECT
  n.nspname AS schema_name,
  c.relname AS table_name,
  c.relkind AS relkind,
  a.attname AS column_name,
  a.attnum::int4 AS ordinal,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  pg_get_expr(ad.adbin, ad.adrelid) AS default_expr,
  EXISTS (
    SELECT 1
    FROM pg_catalog.pg_index i
    WHERE i.indrelid = c.oid
      AND i.indisprimary
      AND a.attnum = ANY(i.indkey::int2[])
  ) AS primary_key
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = c.oid AND ad.adnum = a.attnum
WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
  AND a.attnum > 0
  AND NOT a.attisdropped
  AND n.nspname = ANY($1::text[])
ORDER BY n.nspname, c.relname, a.attnum
"#,
            &[&schemas],
        )
        .await?;

    let mut tables: BTreeMap<(String, String), TableInfo> = BTreeMap::new();

    for row in rows {
        let schema_name: String = get(&row, "schema_name")?;
        let table_name: String = get(&row, "table_name")?;
        let relkind: i8 = get(&row, "relkind")?;

        let column = ColumnInfo {
            name: get(&row, "column_name")?,
            data_type: get(&row, "data_type")?,
            not_null: get(&row, "not_null")?,
            default_expr: get(&row, "default_expr")?,
            ordinal: get(&row, "ordinal")?,
            primary_key: get(&row, "primary_key")?,
        };

        let key = (schema_name.clone(), table_name.clone());
        tables
            .entry(key)
            .or_insert_with(|| TableInfo {
                schema: schema_name,
                name: table_name,
                kind: RelationKind::from_relkind(relkind),
                columns: Vec::new(),
            })
            .columns
            .push(column);
    }

    if tables.is_empty() {
        tracing::warn!(
            target: "tablekit.schema",
            schemas = ?schemas,
            "no tables found in the selected schemas"
        );
    }

    Ok((tables.into_values().collect(), fingerprint))
}
