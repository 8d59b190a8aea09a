use crate::cli::ConnectArgs;
use serde::Deserialize;
use std::path::PathBuf;
use tablekit::{Database, DatabaseConfig, TableDef};

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let mut file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to parse config file {}: {e}",
                config_path.display()
            )
        })?;

        file.expand_env()?;
        file.validate()?;

        Ok(Self { config_path, file })
    }
}

/// `tablekit.toml`.
///
/// ```toml
/// version = "1"
///
/// [database]
/// url = "${DATABASE_URL}"
/// schemas = ["public"]
///
/// [[tables]]
/// name = "hosts"
/// columns = [{ name = "id", type = "bigserial PRIMARY KEY" }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub tables: Vec<TableDef>,
}

impl ConfigFile {
    fn expand_env(&mut self) -> anyhow::Result<()> {
        self.database.url = expand_env_vars(&self.database.url)?;
        self.database.maintenance_db = expand_env_vars(&self.database.maintenance_db)?;

        for s in &mut self.database.schemas {
            *s = expand_env_vars(s)?;
        }

        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must not be empty");
        }

        let mut seen = std::collections::HashSet::<(Option<&str>, &str)>::new();
        for t in self.tables.iter().chain(&self.database.tables) {
            if !seen.insert((t.schema.as_deref(), t.name.as_str())) {
                anyhow::bail!("duplicate tables.name: {}", t.name);
            }
        }

        self.database_config().validate()?;
        Ok(())
    }

    /// The library config, with top-level `[[tables]]` merged in.
    pub fn database_config(&self) -> DatabaseConfig {
        let mut config = self.database.clone();
        config.tables.extend(self.tables.iter().cloned());
        config
    }
}

/// Resolve the effective [`DatabaseConfig`] for a command.
///
/// Without a config file, `--database` alone is enough.
pub fn resolve(conn: &ConnectArgs) -> anyhow::Result<DatabaseConfig> {
    let _ = dotenvy::dotenv();

    if conn.config.exists() {
        let project = ProjectConfig::load(conn.config.clone())?;
        tracing::debug!(
            config = %project.config_path.display(),
            tables = project.file.tables.len(),
            "loaded config"
        );
        let mut config = project.file.database_config();
        if let Some(url) = &conn.database {
            config.url = url.clone();
        }
        return Ok(config);
    }

    let Some(url) = conn.database.clone() else {
        anyhow::bail!(
            "failed to load config {}; provide --database or run `tablekit init` first",
            conn.config.display()
        );
    };
    Ok(DatabaseConfig::new(url))
}

pub async fn connect(conn: &ConnectArgs) -> anyhow::Result<(Database, DatabaseConfig)> {
    let config = resolve(conn)?;
    let db = Database::connect(&config).await.map_err(|e| {
        anyhow::anyhow!("failed to connect ({}): {e}", e.code())
    })?;
    Ok((db, config))
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_vars_and_keeps_plain_text() {
        // PATH is set in any test environment.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("a-${PATH}-b").unwrap(), format!("a-{path}-b"));
        assert_eq!(expand_env_vars("$HOME {x}").unwrap(), "$HOME {x}");
    }

    #[test]
    fn rejects_bad_references() {
        assert!(expand_env_vars("${").is_err());
        assert!(expand_env_vars("${}").is_err());
        assert!(expand_env_vars("${TABLEKIT_SURELY_UNSET_VAR}").is_err());
    }

    #[test]
    fn parses_and_merges_tables() {
        let raw = r#"
version = "1"

[database]
url = "postgres://localhost/app"
schemas = ["public", "audit"]
create_if_missing = true

[[tables]]
name = "hosts"
columns = [
  { name = "id", type = "bigserial PRIMARY KEY" },
  { name = "name", type = "text NOT NULL" },
]
constraints = ["UNIQUE (name)"]
"#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        file.validate().unwrap();

        let config = file.database_config();
        assert!(config.create_if_missing);
        assert_eq!(config.schemas, vec!["public", "audit"]);
        assert_eq!(config.maintenance_db, "postgres");
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.tables[0].columns[1].data_type, "text NOT NULL");
    }

    #[test]
    fn rejects_wrong_version_and_duplicate_tables() {
        let raw = r#"
version = "2"
[database]
url = "postgres://localhost/app"
"#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert!(file.validate().is_err());

        let raw = r#"
version = "1"
[database]
url = "postgres://localhost/app"
[[tables]]
name = "t"
columns = [{ name = "id", type = "int" }]
[[tables]]
name = "t"
columns = [{ name = "id", type = "int" }]
"#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn database_flag_alone_is_enough() {
        let conn = ConnectArgs {
            config: PathBuf::from("/nonexistent/tablekit.toml"),
            database: Some("postgres://localhost/app".to_string()),
        };
        assert_eq!(resolve(&conn).unwrap().url, "postgres://localhost/app");

        let conn = ConnectArgs {
            config: PathBuf::from("/nonexistent/tablekit.toml"),
            database: None,
        };
        assert!(resolve(&conn).is_err());
    }
}
