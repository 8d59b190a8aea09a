use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "tablekit.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Init,
    Schema,
    Apply,
    Select,
    Exec,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Init(InitArgs),
    Schema(SchemaArgs),
    Apply(ApplyArgs),
    Select(SelectArgs),
    Exec(ExecArgs),
}

/// Where to find the database: the config file, optionally overridden by `--database`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgs {
    pub config: PathBuf,
    pub database: Option<String>,
}

impl Default for ConnectArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            database: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub config: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SchemaArgs {
    pub conn: ConnectArgs,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct ApplyArgs {
    pub conn: ConnectArgs,
}

#[derive(Debug, Clone)]
pub struct SelectArgs {
    pub conn: ConnectArgs,
    pub table: String,
    pub columns: Vec<String>,
    /// `(column, literal)` pairs from `--where column=literal`.
    pub filters: Vec<(String, String)>,
    pub limit: Option<u64>,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct ExecArgs {
    pub conn: ConnectArgs,
    pub sql: String,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };
    let rest = it.map(|s| s.as_str());

    match first.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help(HelpTopic::Root)),
        "init" => parse_init(rest),
        "schema" => parse_schema(rest),
        "apply" => parse_apply(rest),
        "select" => parse_select(rest),
        "exec" => parse_exec(rest),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

fn flag_value<'a>(flag: &str, it: &mut impl Iterator<Item = &'a str>) -> anyhow::Result<&'a str> {
    it.next()
        .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
}

/// Consume `--config`/`--database` (both `--flag value` and `--flag=value`).
///
/// Returns `false` when `token` is not a connection flag.
fn parse_connect_flag<'a>(
    token: &'a str,
    it: &mut impl Iterator<Item = &'a str>,
    conn: &mut ConnectArgs,
) -> anyhow::Result<bool> {
    match token {
        "--config" => conn.config = PathBuf::from(flag_value(token, it)?),
        _ if token.starts_with("--config=") => {
            conn.config = PathBuf::from(token.trim_start_matches("--config="));
        }
        "--database" => conn.database = Some(flag_value(token, it)?.to_string()),
        _ if token.starts_with("--database=") => {
            conn.database = Some(token.trim_start_matches("--database=").to_string());
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_init<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);

    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Init)),
            "--config" => config = PathBuf::from(flag_value(token, &mut it)?),
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Init(InitArgs { config }))
}

fn parse_schema<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut conn = ConnectArgs::default();
    let mut json = false;

    while let Some(token) = it.next() {
        if parse_connect_flag(token, &mut it, &mut conn)? {
            continue;
        }
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Schema)),
            "--json" => json = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Schema(SchemaArgs { conn, json }))
}

fn parse_apply<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut conn = ConnectArgs::default();

    while let Some(token) = it.next() {
        if parse_connect_flag(token, &mut it, &mut conn)? {
            continue;
        }
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Apply)),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Apply(ApplyArgs { conn }))
}

fn parse_select<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut conn = ConnectArgs::default();
    let mut table: Option<String> = None;
    let mut columns: Vec<String> = Vec::new();
    let mut filters: Vec<(String, String)> = Vec::new();
    let mut limit: Option<u64> = None;
    let mut json = false;

    while let Some(token) = it.next() {
        if parse_connect_flag(token, &mut it, &mut conn)? {
            continue;
        }
        match token {
            "-h" | "--help" => return Ok(Command::Help(HelpTopic::Select)),
            "--json" => json = true,
            "--columns" => columns.extend(split_csv(flag_value(token, &mut it)?)),
            _ if token.starts_with("--columns=") => {
                columns.extend(split_csv(token.trim_start_matches("--columns=")));
            }
            "--where" => filters.push(parse_where(flag_value(token, &mut it)?)?),
            _ if token.starts_with("--where=") => {
                filters.push(parse_where(token.trim_start_matches("--where="))?);
            }
            "--limit" => limit = Some(parse_limit(flag_value(token, &mut it)?)?),
            _ if token.starts_with("--limit=") => {
                limit = Some(parse_limit(token.trim_start_matches("--limit="))?);
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other if table.is_none() => table = Some(other.to_string()),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    let Some(table) = table else {
        anyhow::bail!("missing table: expected `tablekit select <TABLE>`");
    };

    Ok(Command::Select(SelectArgs {
        conn,
        table,
        columns,
        filters,
        limit,
        json,
    }))
}

fn parse_exec<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut conn = ConnectArgs::default();
    let mut words: Vec<&str> = Vec::new();

    while let Some(token) = it.next() {
        if words.is_empty() {
            if parse_connect_flag(token, &mut it, &mut conn)? {
                continue;
            }
            if matches!(token, "-h" | "--help") {
                return Ok(Command::Help(HelpTopic::Exec));
            }
        }
        words.push(token);
    }

    if words.is_empty() {
        anyhow::bail!("missing SQL: expected `tablekit exec <SQL>`");
    }

    Ok(Command::Exec(ExecArgs {
        conn,
        sql: words.join(" "),
    }))
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_where(v: &str) -> anyhow::Result<(String, String)> {
    let Some((column, literal)) = v.split_once('=') else {
        anyhow::bail!("--where expects COLUMN=VALUE, got `{v}`");
    };
    let column = column.trim();
    if column.is_empty() {
        anyhow::bail!("--where expects COLUMN=VALUE, got `{v}`");
    }
    Ok((column.to_string(), literal.to_string()))
}

fn parse_limit(v: &str) -> anyhow::Result<u64> {
    v.parse()
        .map_err(|_| anyhow::anyhow!("--limit expects a non-negative integer, got `{v}`"))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
tablekit - schema-checked PostgreSQL access from the command line

USAGE:
  tablekit <COMMAND> [OPTIONS]

COMMANDS:
  init          Write a starter tablekit.toml
  schema        Print the introspected schema
  apply         Create the database if configured and apply [[tables]]
  select        Select rows from a table
  exec          Run one SQL statement

Run `tablekit <command> --help` for more."
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  tablekit init [OPTIONS]

OPTIONS:
  --config <FILE>       Config file to write (default: tablekit.toml)
  -h, --help            Print help"
            );
        }
        HelpTopic::Schema => {
            println!(
                "\
USAGE:
  tablekit schema [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: tablekit.toml)
  --database <URL>      Override database.url from config
  --json                Print the schema cache as JSON
  -h, --help            Print help"
            );
        }
        HelpTopic::Apply => {
            println!(
                "\
USAGE:
  tablekit apply [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: tablekit.toml)
  --database <URL>      Override database.url from config
  -h, --help            Print help"
            );
        }
        HelpTopic::Select => {
            println!(
                "\
USAGE:
  tablekit select <TABLE> [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: tablekit.toml)
  --database <URL>      Override database.url from config
  --columns <CSV>       Columns to project (default: all)
  --where <COL=VALUE>   Equality filter; repeatable. VALUE `NULL` matches IS NULL
  --limit <N>           Maximum number of rows
  --json                Print rows as JSON
  -h, --help            Print help"
            );
        }
        HelpTopic::Exec => {
            println!(
                "\
USAGE:
  tablekit exec [OPTIONS] <SQL>...

OPTIONS:
  --config <FILE>       Config file path (default: tablekit.toml)
  --database <URL>      Override database.url from config
  -h, --help            Print help"
            );
        }
    }
}
