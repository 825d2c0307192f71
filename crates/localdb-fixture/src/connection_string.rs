//! ADO.NET-style connection strings.
//!
//! The fixture derives two connection strings from one base string: one for
//! the administrative `master` database and one for the target database.
//! An `AttachDbFilename` entry may carry a `{database}` token so each target
//! database gets its own data file.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Token in an `AttachDbFilename` value replaced with the database name.
pub const DATABASE_TOKEN: &str = "{database}";

/// Name of the administrative database.
pub const MASTER_DATABASE: &str = "master";

const CATALOG_KEY: &str = "Initial Catalog";
const CATALOG_ALIASES: &[&str] = &["initial catalog", "database"];
const ATTACH_ALIASES: &[&str] = &["attachdbfilename", "initial file name"];

/// SQL Server LocalDB instance versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalDbVersion(String);

impl LocalDbVersion {
    /// LocalDB 2012.
    #[must_use]
    pub fn v11() -> Self {
        Self("v11.0".into())
    }

    /// LocalDB 2014.
    #[must_use]
    pub fn v12() -> Self {
        Self("v12.0".into())
    }

    /// A named instance or any other version string.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The instance name as used in `Data Source`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parsed connection string, preserving key spelling and order.
///
/// Equality is field-wise: two values are equal when they hold the same
/// entries in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionString {
    entries: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parse a custom connection string.
    ///
    /// ```
    /// use localdb_fixture::ConnectionString;
    ///
    /// let cs = ConnectionString::custom("Server=localhost,1433;User Id=sa;Password=secret;")?;
    /// assert_eq!(cs.get("user id"), Some("sa"));
    /// # Ok::<(), localdb_fixture::Error>(())
    /// ```
    pub fn custom(conn_str: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::ConnectionString(format!("invalid key-value: {part}")))?;

            let key = key.trim();
            if key.is_empty() {
                return Err(Error::ConnectionString(format!("missing key: {part}")));
            }

            entries.push((key.to_string(), value.trim().to_string()));
        }

        Ok(Self { entries })
    }

    /// Connection string for a LocalDB instance using Windows authentication.
    #[must_use]
    pub fn local_db(version: &LocalDbVersion) -> Self {
        Self {
            entries: vec![
                ("Data Source".into(), format!("(LocalDb)\\{}", version.as_str())),
                ("Integrated Security".into(), "SSPI".into()),
            ],
        }
    }

    /// Derive the connection string addressing `database`.
    ///
    /// - For [`MASTER_DATABASE`], any attach-file entry is dropped and the
    ///   catalog is set to `master`.
    /// - When an attach-file entry contains [`DATABASE_TOKEN`], the token is
    ///   replaced with `database` and the catalog entry is removed; the
    ///   attached file determines the database.
    /// - Otherwise the catalog is set to `database`.
    #[must_use]
    pub fn for_database(&self, database: &str) -> Self {
        let mut entries = self.entries.clone();

        if database.eq_ignore_ascii_case(MASTER_DATABASE) {
            entries.retain(|(key, _)| !is_any(key, ATTACH_ALIASES));
            set_catalog(&mut entries, database);
            return Self { entries };
        }

        let templated = entries
            .iter()
            .any(|(key, value)| is_any(key, ATTACH_ALIASES) && value.contains(DATABASE_TOKEN));

        if templated {
            for (key, value) in &mut entries {
                if is_any(key, ATTACH_ALIASES) {
                    *value = value.replace(DATABASE_TOKEN, database);
                }
            }
            entries.retain(|(key, _)| !is_any(key, CATALOG_ALIASES));
        } else {
            set_catalog(&mut entries, database);
        }

        Self { entries }
    }

    /// Look up a value by key, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The catalog (database) entry, if present.
    #[must_use]
    pub fn catalog(&self) -> Option<&str> {
        self.find_any(CATALOG_ALIASES)
    }

    /// The attach-file entry, if present.
    #[must_use]
    pub fn attach_db_filename(&self) -> Option<&str> {
        self.find_any(ATTACH_ALIASES)
    }

    /// Iterate entries in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn find_any(&self, aliases: &[&str]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| is_any(k, aliases))
            .map(|(_, v)| v.as_str())
    }
}

fn is_any(key: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|alias| key.eq_ignore_ascii_case(alias))
}

fn set_catalog(entries: &mut Vec<(String, String)>, database: &str) {
    let mut replaced = false;
    entries.retain_mut(|(key, value)| {
        if !is_any(key, CATALOG_ALIASES) {
            return true;
        }
        if replaced {
            return false;
        }
        *value = database.to_string();
        replaced = true;
        true
    });

    if !replaced {
        entries.push((CATALOG_KEY.to_string(), database.to_string()));
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::custom(s)
    }
}
