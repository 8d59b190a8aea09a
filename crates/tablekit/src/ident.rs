//! SQL identifier parsing and quoting.
//!
//! Identifiers handed to the statement builders are names as the catalog
//! reports them (`users`, `public.users`, `users.email`). They are parsed
//! into parts, resolved against the schema cache, and rendered with
//! driver-level quoting where PostgreSQL would otherwise fold or reject them.
//!
//! - Bare parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`

use crate::error::{DbError, DbResult};

/// Words that must always be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "all", "and", "any", "array", "as", "asc", "both", "case", "cast", "check", "collate",
    "column", "constraint", "create", "default", "desc", "distinct", "do", "else", "end", "except",
    "false", "fetch", "for", "foreign", "from", "grant", "group", "having", "in", "into",
    "is", "join", "leading", "limit", "not", "null", "offset", "on", "only", "or", "order",
    "primary", "references", "select", "table", "then", "to", "true", "union", "unique", "user",
    "using", "when", "where", "with",
];

/// A possibly dotted SQL identifier (`schema.table`, `table.column`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable"`
    pub fn parse(s: &str) -> DbResult<Self> {
        if s.is_empty() {
            return Err(DbError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(DbError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(DbError::validation(format!(
                                "Trailing '.' in identifier '{s}'"
                            )));
                        }
                    }
                    Some(c) => {
                        return Err(DbError::validation(format!(
                            "Expected '.' between identifier parts in '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                name.push('"');
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => {
                            return Err(DbError::validation(format!(
                                "Unclosed quoted identifier '{s}'"
                            )));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(DbError::validation("Empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(DbError::validation(format!(
                        "Invalid character '{c}' in identifier '{s}'"
                    )));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(DbError::validation(format!(
                    "Empty identifier segment in '{s}'"
                )));
            }
            parts.push(name);
        }

        Ok(Self { parts })
    }

    /// Last part of the identifier (the object name itself).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Everything before the last part, if the identifier is qualified.
    pub fn qualifier(&self) -> Option<&str> {
        match self.parts.len() {
            0 | 1 => None,
            n => Some(self.parts[n - 2].as_str()),
        }
    }

    /// Render the identifier as SQL, quoting parts where needed.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            write_ident(&mut out, part);
        }
        out
    }
}

/// Whether `name` can be emitted bare without PostgreSQL folding or rejecting it.
pub fn is_plain(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_ascii_lowercase()) {
        return false;
    }
    if !chars.all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return false;
    }
    !RESERVED.contains(&name)
}

/// Render a single identifier part, quoting it when required.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_ident(&mut out, name);
    out
}

pub(crate) fn write_ident(out: &mut String, name: &str) {
    if is_plain(name) {
        out.push_str(name);
        return;
    }
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}
