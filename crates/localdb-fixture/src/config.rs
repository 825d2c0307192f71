//! Fixture configuration.

use std::path::Path;

use sqlcmd_script::{Fingerprint, SchemaScript};

use crate::connection_string::ConnectionString;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Environment variable holding the base connection string.
pub const ENV_CONNECTION_STRING: &str = "LOCALDB_CONNECTION_STRING";
/// Environment variable holding the target database name.
pub const ENV_DATABASE: &str = "LOCALDB_DATABASE";
/// Environment variable holding the path of the schema script.
pub const ENV_SCHEMA_FILE: &str = "LOCALDB_SCHEMA_FILE";
/// Environment variable enabling the fingerprint suffix on the database name.
pub const ENV_HASH_SUFFIX: &str = "LOCALDB_HASH_SUFFIX";

/// What to conclude when the deployment marker cannot be probed for a reason
/// other than "it does not exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Treat the schema as not deployed and deploy again.
    ///
    /// A transient failure costs a redundant deployment, which the script
    /// executor tolerates.
    #[default]
    AssumeNotDeployed,
    /// Return [`Error::MarkerProbe`] from the deployment.
    FailClosed,
}

/// Parameters for a test database.
///
/// Value type: equality is field-wise and every setter returns a new value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct DbParams {
    /// Base connection string; the database part is resolved per endpoint.
    pub connection_string: ConnectionString,
    /// Schema script to deploy.
    pub schema: SchemaScript,
    /// Logical target database name.
    pub database_name: String,
    /// Append the schema fingerprint to the database name, so several schema
    /// versions can coexist on one server.
    pub use_schema_hash_suffix: bool,
    /// Retry policy for recording the deployment marker.
    pub marker_retry: RetryPolicy,
    /// Policy for indeterminate marker probes.
    pub probe_policy: ProbePolicy,
}

impl DbParams {
    /// Create parameters with default retry and probe policies.
    #[must_use]
    pub fn new(
        connection_string: ConnectionString,
        schema: SchemaScript,
        database_name: impl Into<String>,
        use_schema_hash_suffix: bool,
    ) -> Self {
        Self {
            connection_string,
            schema,
            database_name: database_name.into(),
            use_schema_hash_suffix,
            marker_retry: RetryPolicy::default(),
            probe_policy: ProbePolicy::default(),
        }
    }

    /// Load parameters from the environment.
    ///
    /// Reads [`ENV_CONNECTION_STRING`], [`ENV_DATABASE`] and
    /// [`ENV_SCHEMA_FILE`] (all required) and [`ENV_HASH_SUFFIX`]
    /// (optional, `true`/`1`/`yes`).
    pub fn from_env() -> Result<Self> {
        let connection_string = ConnectionString::custom(&required_env(ENV_CONNECTION_STRING)?)?;
        let database_name = required_env(ENV_DATABASE)?;
        let schema = load_schema(required_env(ENV_SCHEMA_FILE)?)?;
        let use_schema_hash_suffix = std::env::var(ENV_HASH_SUFFIX)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(Self::new(
            connection_string,
            schema,
            database_name,
            use_schema_hash_suffix,
        ))
    }

    /// Replace the connection string.
    #[must_use]
    pub fn with_connection_string(mut self, connection_string: ConnectionString) -> Self {
        self.connection_string = connection_string;
        self
    }

    /// Replace the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaScript) -> Self {
        self.schema = schema;
        self
    }

    /// Replace the database name.
    #[must_use]
    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    /// Enable or disable the fingerprint suffix.
    #[must_use]
    pub fn with_use_schema_hash_suffix(mut self, enabled: bool) -> Self {
        self.use_schema_hash_suffix = enabled;
        self
    }

    /// Replace the marker retry policy.
    #[must_use]
    pub fn with_marker_retry(mut self, policy: RetryPolicy) -> Self {
        self.marker_retry = policy;
        self
    }

    /// Replace the probe policy.
    #[must_use]
    pub fn with_probe_policy(mut self, policy: ProbePolicy) -> Self {
        self.probe_policy = policy;
        self
    }

    /// Database name for the given schema fingerprint.
    #[must_use]
    pub fn resolved_database_name(&self, fingerprint: &Fingerprint) -> String {
        if self.use_schema_hash_suffix {
            format!("{}_{}", self.database_name, fingerprint)
        } else {
            self.database_name.clone()
        }
    }
}

/// Read and normalize a schema script from disk.
pub fn load_schema(path: impl AsRef<Path>) -> Result<SchemaScript> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    Ok(SchemaScript::new(raw.trim_start_matches('\u{feff}')))
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::Config(format!("{key} is not set")))
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1"
}
