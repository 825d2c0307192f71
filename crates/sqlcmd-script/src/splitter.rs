//! `GO` batch splitting.
//!
//! `GO` is not T-SQL. It is a client-side separator understood by `sqlcmd`
//! and SSMS, so a script has to be cut into batches before a driver can send
//! it. The separator must occupy its own line and is matched case-sensitively.

use std::fmt;

/// Batch separator line.
pub const BATCH_SEPARATOR: &str = "GO";

/// Batches starting with one of these keywords are never executed.
///
/// `PRINT` only produces progress output; `GRANT` statements target
/// principals that exist in the production environment only.
pub const IGNORED_STATEMENT_PREFIXES: &[&str] = &["PRINT", "GRANT"];

/// One independently executable batch extracted from a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandUnit {
    batch: usize,
    sql: String,
}

impl CommandUnit {
    /// Zero-based position of the source batch this unit came from.
    ///
    /// Counts every separator, including ones around skipped batches, so the
    /// value points back into the original script.
    #[must_use]
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// The batch text, trimmed of surrounding whitespace.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Consume the unit and return its text.
    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }
}

impl fmt::Display for CommandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Split script text into executable batches, in source order.
///
/// Whitespace-only batches and batches starting with one of
/// [`IGNORED_STATEMENT_PREFIXES`] are dropped. A script without separators
/// yields a single unit, or none when it is blank.
#[must_use]
pub fn split(text: &str) -> Vec<CommandUnit> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut batch = 0;

    for line in text.lines() {
        if line == BATCH_SEPARATOR {
            push_unit(&mut units, &current, batch);
            current.clear();
            batch += 1;
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    push_unit(&mut units, &current, batch);

    units
}

fn push_unit(units: &mut Vec<CommandUnit>, fragment: &str, batch: usize) {
    let sql = fragment.trim();
    if sql.is_empty() {
        return;
    }

    if is_ignored(sql) {
        tracing::trace!(batch = batch, "skipping non-executable batch");
        return;
    }

    units.push(CommandUnit {
        batch,
        sql: sql.to_string(),
    });
}

fn is_ignored(sql: &str) -> bool {
    IGNORED_STATEMENT_PREFIXES
        .iter()
        .any(|prefix| sql.starts_with(prefix))
}
