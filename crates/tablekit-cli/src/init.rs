use crate::cli::InitArgs;
use std::path::Path;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.config)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    std::fs::write(path, TEMPLATE)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    Ok(())
}

const TEMPLATE: &str = r#"version = "1"

[database]
url = "${DATABASE_URL}"
schemas = ["public"]
# Create the target database on connect when it does not exist.
create_if_missing = false
maintenance_db = "postgres"
# Longest SQL text written to logs, in bytes.
log_sql_max_len = 200

# Tables created by `tablekit apply` (CREATE TABLE IF NOT EXISTS).
#
# [[tables]]
# name = "hosts"
# schema = "public"
# columns = [
#   { name = "id", type = "bigserial PRIMARY KEY" },
#   { name = "hostname", type = "text NOT NULL" },
#   { name = "seen_at", type = "timestamptz NOT NULL DEFAULT now()" },
# ]
# constraints = ["UNIQUE (hostname)"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tablekit-init-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn template_is_a_valid_config() {
        let file: crate::config::ConfigFile = toml::from_str(TEMPLATE).unwrap();
        assert_eq!(file.version, "1");
        assert_eq!(file.database.url, "${DATABASE_URL}");
        assert!(file.tables.is_empty());
    }

    #[test]
    fn creates_parent_and_refuses_overwrite() {
        let dir = scratch_dir("overwrite");
        let path = dir.join("nested").join("tablekit.toml");

        write_template(&path).unwrap();
        assert!(path.exists());

        let err = write_template(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
