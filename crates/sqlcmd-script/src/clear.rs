//! Table-clearing batch generation.
//!
//! Rows are removed in three passes over the whole table set: disable every
//! table's constraints, delete from every table, re-enable every table's
//! constraints. Foreign keys between the tables therefore never block a
//! delete, whatever order the tables are listed in.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScriptError};

// Up to four name parts (server.database.schema.object), each bracket-quoted
// or a regular identifier. Inside brackets `]]` stands for a literal `]`.
#[allow(clippy::unwrap_used)]
static TABLE_IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\[(?:[^\]\r\n]|\]\]){1,128}\]|[A-Za-z_#][A-Za-z0-9_@#$]{0,127})(?:\.(?:\[(?:[^\]\r\n]|\]\]){1,128}\]|[A-Za-z_][A-Za-z0-9_@#$]{0,127})){0,3}$",
    )
    .unwrap()
});

/// Check that `name` is a single, optionally qualified, table name.
pub fn validate_table_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ScriptError::InvalidIdentifier(
            "identifier cannot be empty".into(),
        ));
    }

    if !TABLE_IDENTIFIER_RE.is_match(name) {
        return Err(ScriptError::InvalidIdentifier(format!(
            "invalid table identifier '{name}': expected plain or [bracketed] name parts \
             separated by dots"
        )));
    }

    Ok(())
}

/// Build a batch that deletes all rows from `tables`.
///
/// Duplicate names are cleared once. Returns an empty string for an empty
/// table set.
pub fn clear_tables_script<I, S>(tables: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for table in tables {
        let table = table.as_ref().trim();
        validate_table_identifier(table)?;
        if !unique.iter().any(|t| t == table) {
            unique.push(table.to_string());
        }
    }

    let mut script = String::new();
    for table in &unique {
        let _ = writeln!(script, "ALTER TABLE {table} NOCHECK CONSTRAINT ALL");
    }
    for table in &unique {
        let _ = writeln!(script, "DELETE FROM {table}");
    }
    for table in &unique {
        let _ = writeln!(script, "ALTER TABLE {table} CHECK CONSTRAINT ALL");
    }

    Ok(script)
}
