use chrono::{TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};
use rust_decimal::Decimal;
use tablekit::{
    Database, DatabaseConfig, DbError, DbResult, FilterMap, RowMap, SelectStatement, SortOrder,
    TableDef, Value, quote_ident, row,
};

fn database_url(test: &str) -> Option<String> {
    let _ = dotenvy::dotenv();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{}", std::process::id(), nanos)
}

/// Point `url` at another database, keeping every other parameter.
fn with_dbname(url: &str, dbname: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_path(&format!("/{dbname}"));
            parsed.to_string()
        }
        // key/value form: a later `dbname=` overrides an earlier one.
        Err(_) => format!("{url} dbname={dbname}"),
    }
}

async fn setup(url: &str, table: &str) -> DbResult<Database> {
    let mut db = Database::connect(&DatabaseConfig::new(url)).await?;
    db.apply_table(
        &TableDef::new(table)
            .column("id", "bigserial PRIMARY KEY")
            .column("name", "text NOT NULL")
            .column("score", "double precision")
            .column("active", "boolean NOT NULL DEFAULT true")
            .column("created_at", "timestamptz")
            .column("payload", "jsonb"),
    )
    .await?;
    Ok(db)
}

async fn teardown(db: Database, table: &str) -> DbResult<()> {
    db.execute_raw(&format!("DROP TABLE IF EXISTS public.{table}"), &[])
        .await?;
    db.close().await
}

#[tokio::test]
async fn insert_then_select_by_primary_key() -> DbResult<()> {
    let Some(url) = database_url("insert_then_select_by_primary_key") else {
        return Ok(());
    };
    let table = unique_name("tk_roundtrip");
    let mut db = setup(&url, &table).await?;

    let created_at = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
    let input = row! {
        "name" => "alice",
        "score" => 9.5,
        "active" => false,
        "created_at" => created_at,
        "payload" => serde_json::json!({"tags": ["a", "b"]}),
    };
    let returned = db
        .insert_returning(&table, [input.clone()], &["id"])
        .await?;
    assert_eq!(returned.len(), 1);
    let id = returned[0].get("id").cloned().unwrap();

    let rows = db
        .select(&SelectStatement::new(&table).filters(FilterMap::new().with("id", id.into())))
        .await?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains_all(&input));

    teardown(db, &table).await
}

#[tokio::test]
async fn failing_row_rolls_back_whole_batch() -> DbResult<()> {
    let Some(url) = database_url("failing_row_rolls_back_whole_batch") else {
        return Ok(());
    };
    let table = unique_name("tk_rollback");
    let mut db = setup(&url, &table).await?;

    let err = db
        .insert(
            &table,
            [
                row! { "name" => "first" },
                row! { "name" => Value::Null },
                row! { "name" => "third" },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotNullViolation(_)), "got {err:?}");
    assert!(db.select_table(&table).await?.is_empty());

    assert_eq!(
        db.insert(&table, [row! { "name" => "a" }, row! { "name" => "b" }])
            .await?,
        2
    );
    assert_eq!(db.select_table(&table).await?.len(), 2);

    teardown(db, &table).await
}

#[tokio::test]
async fn bare_select_matches_select_star() -> DbResult<()> {
    let Some(url) = database_url("bare_select_matches_select_star") else {
        return Ok(());
    };
    let table = unique_name("tk_star");
    let mut db = setup(&url, &table).await?;
    db.insert(
        &table,
        (0..5).map(|i| row! { "name" => format!("n{i}"), "score" => f64::from(i) }),
    )
    .await?;

    let ordered = SelectStatement::new(&table).order_by("id", SortOrder::Asc);
    let built = db.select(&ordered).await?;
    let raw = db
        .query_raw(&format!("SELECT * FROM public.{table} ORDER BY id"), &[])
        .await?;
    assert_eq!(built, raw);
    assert_eq!(db.select_table(&table).await?.len(), 5);

    teardown(db, &table).await
}

#[tokio::test]
async fn update_and_delete_report_counts() -> DbResult<()> {
    let Some(url) = database_url("update_and_delete_report_counts") else {
        return Ok(());
    };
    let table = unique_name("tk_counts");
    let mut db = setup(&url, &table).await?;
    db.insert(
        &table,
        [
            row! { "name" => "a", "score" => 1.0 },
            row! { "name" => "b" },
            row! { "name" => "c" },
        ],
    )
    .await?;

    let updated = db
        .update(
            &table,
            row! { "score" => 0.0 },
            FilterMap::new().is_null("score"),
        )
        .await?;
    assert_eq!(updated, 2);

    let deleted = db
        .delete(&table, FilterMap::new().raw("score", "< 0.5"))
        .await?;
    assert_eq!(deleted, 2);
    assert_eq!(db.select_table(&table).await?.len(), 1);

    teardown(db, &table).await
}

#[tokio::test]
async fn unknown_names_fail_before_sending() -> DbResult<()> {
    let Some(url) = database_url("unknown_names_fail_before_sending") else {
        return Ok(());
    };
    let table = unique_name("tk_unknown");
    let mut db = setup(&url, &table).await?;

    let err = db
        .insert("no_such_table_here", [row! { "name" => "x" }])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownTable { .. }));

    let err = db
        .insert(&table, [row! { "name" => "x" }, row! { "nickname" => "y" }])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownColumn { .. }));
    // The first row was never sent either.
    assert!(db.select_table(&table).await?.is_empty());

    teardown(db, &table).await
}

#[tokio::test]
async fn schema_changes_are_detected_and_reloaded() -> DbResult<()> {
    let Some(url) = database_url("schema_changes_are_detected_and_reloaded") else {
        return Ok(());
    };
    // A private schema keeps other tests' DDL out of the fingerprint.
    let schema = unique_name("tk_reload");
    let mut db = Database::connect(&DatabaseConfig::new(&url).schemas([schema.as_str()])).await?;
    db.execute_raw(&format!("CREATE SCHEMA {schema}"), &[]).await?;
    db.apply_table(&TableDef::new("items").in_schema(&schema).column("id", "serial"))
        .await?;
    let table = format!("{schema}.items");
    assert!(!db.is_schema_stale().await?);

    db.execute_raw(&format!("ALTER TABLE {table} ADD COLUMN late text"), &[])
        .await?;
    assert!(db.is_schema_stale().await?);
    assert!(db.schema().column(&table, "late").is_err());

    db.reload_schema().await?;
    assert!(!db.is_schema_stale().await?);
    assert_eq!(db.schema().column(&table, "late")?.data_type, "text");
    assert_eq!(db.schema().column("items", "late")?.data_type, "text");

    db.add_columns(&table, &[tablekit::ColumnDef::new("later", "integer")])
        .await?;
    assert_eq!(db.schema().column(&table, "later")?.data_type, "integer");

    db.execute_raw(&format!("DROP SCHEMA {schema} CASCADE"), &[])
        .await?;
    db.close().await
}

#[tokio::test]
async fn missing_database_is_reported_by_name() -> DbResult<()> {
    let Some(url) = database_url("missing_database_is_reported_by_name") else {
        return Ok(());
    };
    let dbname = unique_name("tk_missing");
    let config = DatabaseConfig::new(with_dbname(&url, &dbname));

    match Database::connect(&config).await {
        Err(DbError::DatabaseNotFound { name }) => assert_eq!(name, dbname),
        Err(other) => panic!("expected DatabaseNotFound, got {other:?}"),
        Ok(_) => panic!("database {dbname} unexpectedly exists"),
    }
    Ok(())
}

#[tokio::test]
async fn create_if_missing_creates_database() -> DbResult<()> {
    let Some(url) = database_url("create_if_missing_creates_database") else {
        return Ok(());
    };
    let dbname = unique_name("tk_created");
    let config = DatabaseConfig::new(with_dbname(&url, &dbname)).create_if_missing(true);

    let db = match Database::connect(&config).await {
        Ok(db) => db,
        Err(DbError::DatabaseCreation { name, message }) => {
            eprintln!("cannot create {name} ({message}); skipping create_if_missing_creates_database");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    assert!(db.schema().tables.is_empty());
    db.close().await?;

    let admin = Database::connect(&DatabaseConfig::new(with_dbname(&url, "postgres"))).await?;
    admin
        .execute_raw(&format!("DROP DATABASE IF EXISTS {dbname}"), &[])
        .await?;
    admin.close().await
}

#[tokio::test]
async fn public_table_is_used_even_when_user_schema_shadows_it() -> DbResult<()> {
    let Some(url) = database_url("public_table_is_used_even_when_user_schema_shadows_it") else {
        return Ok(());
    };
    let table = unique_name("tk_shadow");
    let mut db = Database::connect(&DatabaseConfig::new(&url)).await?;

    // The default search_path is `"$user", public`: a schema named after the
    // login role is searched before public.
    let who = db.query_raw("SELECT current_user::text AS who", &[]).await?;
    let user = who[0].get("who").and_then(Value::as_str).unwrap_or_default().to_string();
    let existed = !db
        .query_raw(
            "SELECT 1 AS one FROM pg_namespace WHERE nspname = $1",
            &[Value::from(user.as_str())],
        )
        .await?
        .is_empty();
    if let Err(e) = db
        .execute_raw(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&user)), &[])
        .await
    {
        eprintln!("cannot create schema {user} ({e}); skipping shadow test");
        return db.close().await;
    }
    let shadow = format!("{}.{table}", quote_ident(&user));
    db.execute_raw(&format!("CREATE TABLE {shadow} (id int, who text)"), &[])
        .await?;
    db.execute_raw(&format!("INSERT INTO {shadow} VALUES (1, 'shadow')"), &[])
        .await?;

    db.apply_table(&TableDef::new(&table).column("id", "int").column("who", "text"))
        .await?;
    assert_eq!(db.schema().table(&table)?.schema, "public");

    db.insert(&table, [row! { "id" => 1, "who" => "public" }]).await?;
    let rows = db.select_table(&table).await?;
    assert_eq!(rows, vec![row! { "id" => 1, "who" => "public" }]);

    let updated = db
        .update(&table, row! { "who" => "still public" }, FilterMap::new().eq("id", 1))
        .await?;
    assert_eq!(updated, 1);
    let untouched = db
        .query_raw(&format!("SELECT who FROM {shadow}"), &[])
        .await?;
    assert_eq!(untouched, vec![row! { "who" => "shadow" }]);

    db.execute_raw(&format!("DROP TABLE {shadow}"), &[]).await?;
    if !existed {
        db.execute_raw(&format!("DROP SCHEMA {}", quote_ident(&user)), &[])
            .await?;
    }
    db.execute_raw(&format!("DROP TABLE public.{table}"), &[])
        .await?;
    db.close().await
}

#[tokio::test]
async fn numeric_enum_and_array_columns_round_trip() -> DbResult<()> {
    let Some(url) = database_url("numeric_enum_and_array_columns_round_trip") else {
        return Ok(());
    };
    let table = unique_name("tk_types");
    let mood = unique_name("tk_mood");
    let mut db = Database::connect(&DatabaseConfig::new(&url)).await?;
    db.execute_raw(
        &format!("CREATE TYPE public.{mood} AS ENUM ('sad', 'happy')"),
        &[],
    )
    .await?;
    db.apply_table(
        &TableDef::new(&table)
            .column("id", "bigserial PRIMARY KEY")
            .column("total", "numeric(10,2)")
            .column("mood", format!("public.{mood}"))
            .column("tags", "text[]")
            .column("scores", "int4[]"),
    )
    .await?;

    let total: Decimal = "12.50".parse().expect("decimal literal");
    let input = row! {
        "total" => total,
        "mood" => "happy",
        "tags" => vec![Value::from("a"), Value::from("b")],
        "scores" => vec![Value::Int(1), Value::Null, Value::Int(3)],
    };
    db.insert(&table, [input.clone(), row! { "total" => 3_i64, "mood" => "sad" }])
        .await?;

    let rows = db
        .select(&SelectStatement::new(&table).filters(FilterMap::new().eq("total", total)))
        .await?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains_all(&input), "got {:?}", rows[0]);

    let rows = db
        .select(&SelectStatement::new(&table).filters(FilterMap::new().eq("total", 3_i64)))
        .await?;
    assert_eq!(rows[0].get("total"), Some(&Value::Numeric(Decimal::from(3))));
    assert_eq!(rows[0].get("mood"), Some(&Value::from("sad")));

    let built = db
        .select(&SelectStatement::new(&table).order_by("id", SortOrder::Asc))
        .await?;
    let raw = db
        .query_raw(&format!("SELECT * FROM public.{table} ORDER BY id"), &[])
        .await?;
    assert_eq!(built, raw);
    assert_eq!(built.len(), 2);

    let err = db
        .insert(&table, [row! { "total" => "12.50" }])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ValueType { .. }), "got {err:?}");

    db.execute_raw(&format!("DROP TABLE public.{table}"), &[])
        .await?;
    db.execute_raw(&format!("DROP TYPE public.{mood}"), &[]).await?;
    db.close().await
}

#[tokio::test]
async fn quoted_and_mixed_case_columns_round_trip() -> DbResult<()> {
    let Some(url) = database_url("quoted_and_mixed_case_columns_round_trip") else {
        return Ok(());
    };
    let table = unique_name("tk_names");
    let mut db = Database::connect(&DatabaseConfig::new(&url)).await?;
    db.apply_table(
        &TableDef::new(&table)
            .column("id", "bigserial PRIMARY KEY")
            .column("first name", "text")
            .column("Email", "text")
            .column("order", "integer"),
    )
    .await?;

    let input = row! { "first name" => "ada", "Email" => "ada@example.com", "order" => 1 };
    db.insert(&table, [input.clone()]).await?;

    let rows = db
        .select(
            &SelectStatement::new(&table)
                .columns(["first name", "Email", "order"])
                .filters(FilterMap::new().eq("first name", "ada")),
        )
        .await?;
    assert_eq!(rows, vec![input]);

    let updated = db
        .update(
            &table,
            row! { "Email" => Value::Null },
            FilterMap::new().eq("first name", "ada").eq("order", 1),
        )
        .await?;
    assert_eq!(updated, 1);

    let deleted = db
        .delete(&table, FilterMap::new().is_null("Email"))
        .await?;
    assert_eq!(deleted, 1);
    let empty: Vec<RowMap> = db.select_table(&table).await?;
    assert!(empty.is_empty());

    db.execute_raw(&format!("DROP TABLE public.{table}"), &[])
        .await?;
    db.close().await
}

#[test]
fn with_dbname_rewrites_urls() {
    assert_eq!(
        with_dbname("postgres://u:p@localhost:5432/app?sslmode=disable", "other"),
        "postgres://u:p@localhost:5432/other?sslmode=disable"
    );
    assert_eq!(with_dbname("postgres://localhost", "other"), "postgres://localhost/other");
    assert_eq!(with_dbname("host=localhost", "other"), "host=localhost dbname=other");
}
