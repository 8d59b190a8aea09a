//! Connection settings and declarative table definitions.

use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use crate::schema::TableInfo;
use crate::statement::Statement;
use serde::{Deserialize, Serialize};

fn default_schemas() -> Vec<String> {
    vec!["public".to_string()]
}

fn default_maintenance_db() -> String {
    "postgres".to_string()
}

fn default_log_sql_max_len() -> Option<usize> {
    Some(200)
}

/// Everything [`Database::connect`](crate::Database::connect) needs.
///
/// # Example
/// ```ignore
/// let config = DatabaseConfig::new("postgres://localhost/app")
///     .schema("audit")
///     .create_if_missing(true);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// libpq-style URL or key/value connection string.
    pub url: String,
    /// Schemas to introspect; unqualified table names resolve in this order.
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,
    /// Create the target database through `maintenance_db` when it does not exist.
    #[serde(default)]
    pub create_if_missing: bool,
    #[serde(default = "default_maintenance_db")]
    pub maintenance_db: String,
    /// Truncate logged SQL to this many bytes. `None` logs the full text.
    #[serde(default = "default_log_sql_max_len")]
    pub log_sql_max_len: Option<usize>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            schemas: default_schemas(),
            create_if_missing: false,
            maintenance_db: default_maintenance_db(),
            log_sql_max_len: default_log_sql_max_len(),
            tables: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Replace the schema search list.
    pub fn schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Append a schema to the search list.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schemas.push(schema.into());
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn maintenance_db(mut self, name: impl Into<String>) -> Self {
        self.maintenance_db = name.into();
        self
    }

    pub fn log_sql_max_len(mut self, len: Option<usize>) -> Self {
        self.log_sql_max_len = len;
        self
    }

    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.url.trim().is_empty() {
            return Err(DbError::Config("database url is empty".to_string()));
        }
        if self.schemas.is_empty() {
            return Err(DbError::Config("at least one schema is required".to_string()));
        }
        for schema in &self.schemas {
            single_ident(schema, "schema")?;
        }
        single_ident(&self.maintenance_db, "maintenance database")?;
        for table in &self.tables {
            table.validate()?;
        }
        Ok(())
    }

    /// Parse [`url`](Self::url) into a driver config.
    pub fn pg_config(&self) -> DbResult<tokio_postgres::Config> {
        self.url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbError::Config(format!("invalid database url: {e}")))
    }

    /// Target database name; PostgreSQL defaults it to the user name.
    pub fn database_name(&self) -> DbResult<String> {
        let config = self.pg_config()?;
        config
            .get_dbname()
            .or(config.get_user())
            .map(str::to_string)
            .ok_or_else(|| DbError::Config("database url names no database or user".to_string()))
    }

    /// Same connection parameters, pointed at [`maintenance_db`](Self::maintenance_db).
    pub fn maintenance_config(&self) -> DbResult<tokio_postgres::Config> {
        let mut config = self.pg_config()?;
        config.dbname(&self.maintenance_db);
        Ok(config)
    }
}

/// A column in a [`TableDef`]. The type is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn validate(&self) -> DbResult<()> {
        catalog_name(&self.name, "column")?;
        if self.data_type.trim().is_empty() {
            return Err(DbError::Config(format!(
                "column `{}` has no type",
                self.name
            )));
        }
        Ok(())
    }

    fn definition_sql(&self) -> String {
        let mut out = String::new();
        crate::ident::write_ident(&mut out, &self.name);
        out.push(' ');
        out.push_str(self.data_type.trim());
        out
    }
}

/// Declarative table for `CREATE TABLE IF NOT EXISTS`.
///
/// ```toml
/// [[tables]]
/// name = "hosts"
/// columns = [
///   { name = "id", type = "bigserial PRIMARY KEY" },
///   { name = "name", type = "text NOT NULL" },
/// ]
/// constraints = ["UNIQUE (name)"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub columns: Vec<ColumnDef>,
    /// Table constraints, emitted verbatim after the columns.
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(ColumnDef::new(name, data_type));
        self
    }

    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn validate(&self) -> DbResult<()> {
        single_ident(&self.name, "table")?;
        if let Some(schema) = &self.schema {
            single_ident(schema, "schema")?;
        }
        if self.columns.is_empty() {
            return Err(DbError::Config(format!(
                "table `{}` defines no columns",
                self.name
            )));
        }
        for column in &self.columns {
            column.validate()?;
        }
        Ok(())
    }

    /// `CREATE TABLE IF NOT EXISTS ...`.
    pub fn create_table_sql(&self) -> DbResult<Statement> {
        self.validate()?;

        let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
        if let Some(schema) = &self.schema {
            crate::ident::write_ident(&mut sql, schema);
            sql.push('.');
        }
        crate::ident::write_ident(&mut sql, &self.name);
        sql.push_str(" (");
        let items = self
            .columns
            .iter()
            .map(ColumnDef::definition_sql)
            .chain(self.constraints.iter().map(|c| c.trim().to_string()));
        for (i, item) in items.enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&item);
        }
        sql.push(')');

        Ok(Statement::raw(sql, Vec::new()).tagged(format!("create_table.{}", self.name)))
    }
}

/// `ALTER TABLE <table> ADD COLUMN IF NOT EXISTS ...` for each column, as one statement.
pub fn add_columns_sql(table: &TableInfo, columns: &[ColumnDef]) -> DbResult<Statement> {
    if columns.is_empty() {
        return Err(DbError::validation(format!(
            "no columns to add to {}",
            table.qualified_name()
        )));
    }
    let mut sql = String::from("ALTER TABLE ");
    table.write_sql_name(&mut sql);
    for (i, column) in columns.iter().enumerate() {
        column.validate()?;
        sql.push_str(if i == 0 { " " } else { ", " });
        sql.push_str("ADD COLUMN IF NOT EXISTS ");
        sql.push_str(&column.definition_sql());
    }
    Ok(Statement::raw(sql, Vec::new()).tagged(format!("add_columns.{}", table.qualified_name())))
}

/// Column names are taken verbatim (as row mappings use them) and quoted
/// on output, so only names PostgreSQL cannot store are rejected.
fn catalog_name(name: &str, what: &str) -> DbResult<()> {
    if name.is_empty() || name.contains('\0') || name.len() > 63 {
        return Err(DbError::Config(format!("invalid {what} name `{name}`")));
    }
    Ok(())
}

fn single_ident(name: &str, what: &str) -> DbResult<()> {
    match Ident::parse(name) {
        Ok(ident) if ident.parts.len() == 1 => Ok(()),
        _ => Err(DbError::Config(format!("invalid {what} name `{name}`"))),
    }
}
