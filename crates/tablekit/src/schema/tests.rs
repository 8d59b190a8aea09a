use super::*;

/// Two tables in `public` plus one in `audit`, shared by builder tests.
pub(crate) fn sample_cache() -> SchemaCache {
    SchemaCache::from_tables(
        vec!["public".to_string(), "audit".to_string()],
        vec![
            TableInfo::new(
                "public",
                "users",
                vec![
                    ColumnInfo::new("id", "bigint").primary_key(),
                    ColumnInfo::new("name", "text"),
                    ColumnInfo::new("email", "character varying(255)"),
                    ColumnInfo::new("age", "integer"),
                    ColumnInfo::new("score", "double precision"),
                    ColumnInfo::new("active", "boolean"),
                    ColumnInfo::new("order", "integer"),
                    ColumnInfo::new("created_at", "timestamp with time zone"),
                ],
            ),
            TableInfo::new(
                "public",
                "orders",
                vec![
                    ColumnInfo::new("id", "bigint").primary_key(),
                    ColumnInfo::new("user_id", "bigint"),
                    ColumnInfo::new("total", "numeric(10,2)"),
                    ColumnInfo::new("note", "text"),
                ],
            ),
            TableInfo::new(
                "audit",
                "events",
                vec![
                    ColumnInfo::new("id", "bigint").primary_key(),
                    ColumnInfo::new("payload", "jsonb"),
                ],
            ),
        ],
    )
}

#[test]
fn resolves_unqualified_through_search_order() {
    let cache = sample_cache();
    assert_eq!(cache.table("users").unwrap().schema, "public");
    assert_eq!(cache.table("events").unwrap().schema, "audit");
}

#[test]
fn resolves_qualified_names() {
    let cache = sample_cache();
    assert_eq!(cache.table("audit.events").unwrap().name, "events");
    assert!(cache.table("public.events").is_err());
}

#[test]
fn unknown_table_carries_name() {
    let cache = sample_cache();
    match cache.table("ghosts") {
        Err(DbError::UnknownTable { table }) => assert_eq!(table, "ghosts"),
        other => panic!("expected UnknownTable, got {other:?}"),
    }
}

#[test]
fn injection_shaped_table_name_is_unknown() {
    let cache = sample_cache();
    assert!(matches!(
        cache.table("users; DROP TABLE users"),
        Err(DbError::UnknownTable { .. })
    ));
}

#[test]
fn unknown_column_carries_table_and_column() {
    let cache = sample_cache();
    match cache.column("users", "nickname") {
        Err(DbError::UnknownColumn { table, column }) => {
            assert_eq!(table, "public.users");
            assert_eq!(column, "nickname");
        }
        other => panic!("expected UnknownColumn, got {other:?}"),
    }
}

#[test]
fn sql_names_are_always_schema_qualified() {
    let cache = sample_cache();
    assert_eq!(cache.table("users").unwrap().sql_name(), "public.users");
    assert_eq!(cache.table("events").unwrap().sql_name(), "audit.events");
}

#[test]
fn primary_key_and_ordinals() {
    let cache = sample_cache();
    let users = cache.table("users").unwrap();
    let pk: Vec<&str> = users.primary_key().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(pk, vec!["id"]);
    assert_eq!(users.column("name").unwrap().ordinal, 2);
}

#[test]
fn column_types_mapping() {
    let cache = sample_cache();
    let types = cache.column_types();
    assert_eq!(types["public.users"]["email"], "character varying(255)");
    assert_eq!(types["audit.events"]["payload"], "jsonb");
    assert_eq!(cache.table_names(), vec!["users", "orders", "audit.events"]);
}

#[test]
fn check_value_reports_declared_type() {
    let cache = sample_cache();
    let users = cache.table("users").unwrap();
    let age = users.column("age").unwrap();
    assert!(users.check_value(age, &Value::Int(3)).is_ok());
    match users.check_value(age, &Value::Text("three".into())) {
        Err(DbError::ValueType {
            column,
            expected,
            found,
            ..
        }) => {
            assert_eq!(column, "age");
            assert_eq!(expected, "integer");
            assert_eq!(found, "text");
        }
        other => panic!("expected ValueType, got {other:?}"),
    }
}
