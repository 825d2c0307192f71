//! Normalized schema scripts.
//!
//! Database project publish scripts are written for `sqlcmd`: they carry
//! `:setvar`/`:on error` directives and `$(Variable)` template tokens that a
//! plain connection cannot execute. [`SchemaScript`] strips the directives and
//! resolves the tokens the deployment layer knows about.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScriptError};
use crate::fingerprint::Fingerprint;
use crate::splitter::{CommandUnit, split};

/// Template token replaced with the resolved target database name.
pub const DATABASE_NAME_TOKEN: &str = "$(DatabaseName)";

/// Template token for the "running under sqlcmd" flag, always resolved to `True`.
pub const SQLCMD_ENABLED_TOKEN: &str = "$(__IsSqlCmdEnabled)";

/// Lines starting with this character are sqlcmd directives (`:setvar`, `:on error exit`).
pub const SCRIPT_DIRECTIVE_PREFIX: char = ':';

/// Longest database name SQL Server accepts (`sysname`).
pub const MAX_DATABASE_NAME_LEN: usize = 128;

const SQLCMD_ENABLED_VALUE: &str = "True";

// Bracket-quoted or plain name parts, dot-qualified. `]]` escapes `]` inside brackets.
#[allow(clippy::unwrap_used)]
static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"CREATE\s+TABLE\s+((?:\[(?:[^\]]|\]\])+\]|[^\s(\[.;]+)(?:\.(?:\[(?:[^\]]|\]\])+\]|[^\s(\[.;]+))*)",
    )
    .unwrap()
});

/// Schema script text after sqlcmd normalization.
///
/// Immutable once constructed; every transformation returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaScript {
    text: String,
}

impl SchemaScript {
    /// Normalize raw script text.
    ///
    /// Drops empty lines and sqlcmd directive lines, then resolves
    /// [`SQLCMD_ENABLED_TOKEN`]. Line endings are normalized to `\n`.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let text = raw
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty() && !line.starts_with(SCRIPT_DIRECTIVE_PREFIX))
            .collect::<Vec<_>>()
            .join("\n")
            .replace(SQLCMD_ENABLED_TOKEN, SQLCMD_ENABLED_VALUE);

        Self { text }
    }

    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Fingerprint of the normalized text.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.text)
    }

    /// Resolve [`DATABASE_NAME_TOKEN`] to `database`.
    ///
    /// Blank names and names longer than [`MAX_DATABASE_NAME_LEN`] characters
    /// are rejected.
    pub fn with_database_name(&self, database: &str) -> Result<Self> {
        if database.trim().is_empty() {
            return Err(ScriptError::EmptyDatabaseName);
        }

        let len = database.chars().count();
        if len > MAX_DATABASE_NAME_LEN {
            return Err(ScriptError::DatabaseNameTooLong {
                name: database.to_string(),
                len,
                max: MAX_DATABASE_NAME_LEN,
            });
        }

        Ok(Self {
            text: self.text.replace(DATABASE_NAME_TOKEN, database),
        })
    }

    /// Split into executable batches, in source order.
    #[must_use]
    pub fn command_units(&self) -> Vec<CommandUnit> {
        split(&self.text)
    }

    /// Qualified names of the tables this script creates, in source order.
    ///
    /// Duplicates are preserved. Matches inside batches that are not executed
    /// (such as `PRINT` messages) are included as well, since this scans the
    /// whole text.
    #[must_use]
    pub fn created_tables(&self) -> Vec<String> {
        CREATE_TABLE_RE
            .captures_iter(&self.text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Whether the normalized script has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for SchemaScript {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SchemaScript {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}
