//! SQL logging through `tracing`.
//!
//! Every statement executed by the crate is reported on the `tablekit.sql`
//! target before it is sent and again once it completes.

use crate::error::DbError;
use crate::statement::Statement;
use std::time::Duration;
use tracing::Level;

/// Truncate `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn before(&self, stmt: &Statement) {
        let sql = self.truncate_sql(stmt.sql());
        emit_at_level!(
            self.level,
            target: "tablekit.sql",
            kind = %stmt.kind(),
            tag = stmt.tag().unwrap_or("-"),
            param_count = stmt.params().len(),
            sql = %sql,
        );
    }

    /// `rows` is the affected count for writes and the returned count for reads.
    pub(crate) fn after(&self, stmt: &Statement, elapsed: Duration, rows: Result<u64, &DbError>) {
        let tag = stmt.tag().unwrap_or("-");
        match rows {
            Ok(rows) => emit_at_level!(
                self.level,
                target: "tablekit.sql",
                kind = %stmt.kind(),
                tag,
                rows,
                elapsed_ms = elapsed.as_millis() as u64,
                "statement completed"
            ),
            Err(err) => tracing::warn!(
                target: "tablekit.sql",
                kind = %stmt.kind(),
                tag,
                code = err.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "statement failed"
            ),
        }
    }
}
