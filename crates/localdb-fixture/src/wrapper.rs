//! The test database handle.

use sqlcmd_script::{
    Fingerprint, MAX_DATABASE_NAME_LEN, SchemaScript, ScriptError, clear_tables_script,
};

use crate::config::DbParams;
use crate::connection_string::{ConnectionString, MASTER_DATABASE};
use crate::connector::{Connector, Endpoint, MssqlConnector};
use crate::error::Result;
use crate::executor::{ExecutionReport, ScriptExecutor};
use crate::marker::MarkerStore;

/// What [`DbWrapper::deploy_schema`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// The marker for this fingerprint already existed; nothing ran.
    Skipped {
        /// Schema fingerprint.
        fingerprint: Fingerprint,
        /// Resolved database name.
        database: String,
    },
    /// The script ran.
    Deployed {
        /// Schema fingerprint.
        fingerprint: Fingerprint,
        /// Resolved database name.
        database: String,
        /// Per-unit and marker outcomes.
        report: ExecutionReport,
    },
}

impl DeploymentOutcome {
    /// Whether deployment was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Schema fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::Skipped { fingerprint, .. } | Self::Deployed { fingerprint, .. } => fingerprint,
        }
    }

    /// Execution report, if the script ran.
    #[must_use]
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Self::Skipped { .. } => None,
            Self::Deployed { report, .. } => Some(report),
        }
    }
}

/// Handle to one test database: deploys its schema once and clears its
/// tables between tests.
///
/// ```rust,ignore
/// use localdb_fixture::{ConnectionString, DbParams, DbWrapper};
/// use sqlcmd_script::SchemaScript;
///
/// let params = DbParams::new(
///     ConnectionString::custom("Server=localhost,1433;User Id=sa;Password=secret;")?,
///     SchemaScript::new(include_str!("schema.sql")),
///     "orders-tests",
///     true,
/// );
/// let db = DbWrapper::new(params)?;
/// db.deploy_schema().await?;
/// db.clear_tables(db.created_tables()).await?;
/// ```
#[derive(Debug)]
pub struct DbWrapper<C = MssqlConnector> {
    params: DbParams,
    connector: C,
    script: SchemaScript,
    fingerprint: Fingerprint,
    database: String,
    master: Endpoint,
    target: Endpoint,
}

impl DbWrapper<MssqlConnector> {
    /// Create a handle using the `mssql-client` driver.
    pub fn new(params: DbParams) -> Result<Self> {
        Self::with_connector(params, MssqlConnector::new())
    }
}

impl<C: Connector> DbWrapper<C> {
    /// Create a handle using a custom connector.
    ///
    /// The fingerprint is taken over the normalized script before the
    /// database name is substituted, so the suffixed name and the marker agree.
    /// A blank database name is rejected even when the fingerprint suffix
    /// would make the resolved name non-empty, as is a resolved name over
    /// [`MAX_DATABASE_NAME_LEN`] characters.
    pub fn with_connector(params: DbParams, connector: C) -> Result<Self> {
        if params.database_name.trim().is_empty() {
            return Err(ScriptError::EmptyDatabaseName.into());
        }

        let fingerprint = params.schema.fingerprint();
        let database = params.resolved_database_name(&fingerprint);
        let script = params.schema.with_database_name(&database)?;

        let master = Endpoint::resolve(&params.connection_string, MASTER_DATABASE);
        let target = Endpoint::resolve(&params.connection_string, &database);

        Ok(Self {
            params,
            connector,
            script,
            fingerprint,
            database,
            master,
            target,
        })
    }

    /// Connection string for the target database.
    #[must_use]
    pub fn connection_string(&self) -> &ConnectionString {
        &self.target.connection_string
    }

    /// Connection string for the administrative database.
    #[must_use]
    pub fn master_connection_string(&self) -> &ConnectionString {
        &self.master.connection_string
    }

    /// Resolved target database name.
    #[must_use]
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Schema fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Parameters this handle was created with.
    #[must_use]
    pub fn params(&self) -> &DbParams {
        &self.params
    }

    /// Tables the schema script creates, in script order.
    #[must_use]
    pub fn created_tables(&self) -> Vec<String> {
        self.script.created_tables()
    }

    /// Deploy the schema unless this fingerprint is already deployed.
    ///
    /// Statement failures and marker failures are reported in the outcome,
    /// not returned as errors. Errors come only from failing to reach the
    /// administrative database, or from a failed marker probe under
    /// [`ProbePolicy::FailClosed`](crate::ProbePolicy::FailClosed).
    pub async fn deploy_schema(&self) -> Result<DeploymentOutcome> {
        let markers = MarkerStore::new(
            &self.connector,
            &self.target,
            &self.params.marker_retry,
            self.params.probe_policy,
        );

        if markers.exists(&self.fingerprint).await? {
            tracing::info!(
                database = %self.database,
                fingerprint = %self.fingerprint,
                "schema already deployed, skipping"
            );
            return Ok(DeploymentOutcome::Skipped {
                fingerprint: self.fingerprint.clone(),
                database: self.database.clone(),
            });
        }

        let units = self.script.command_units();
        tracing::info!(
            database = %self.database,
            fingerprint = %self.fingerprint,
            units = units.len(),
            "deploying schema"
        );

        let unit_reports = ScriptExecutor::new(&self.connector)
            .execute(&units, &self.master)
            .await?;
        let marker = markers.record(&self.fingerprint).await;

        let report = ExecutionReport {
            units: unit_reports,
            marker,
        };
        tracing::info!(
            database = %self.database,
            succeeded = report.succeeded(),
            failed = report.units.len() - report.succeeded(),
            marker_recorded = report.marker.is_recorded(),
            "schema deployment finished"
        );

        Ok(DeploymentOutcome::Deployed {
            fingerprint: self.fingerprint.clone(),
            database: self.database.clone(),
            report,
        })
    }

    /// Delete all rows from `tables` in the target database.
    ///
    /// Constraints are disabled for the whole set before any delete, so
    /// foreign keys between the tables never block. Runs unconditionally;
    /// errors are returned.
    pub async fn clear_tables<I, S>(&self, tables: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let script = clear_tables_script(tables)?;
        if script.is_empty() {
            return Ok(());
        }

        tracing::debug!(database = %self.database, "clearing tables");
        let mut conn = self.connector.connect(&self.target).await?;
        let result = conn.execute(&script).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing clear-tables connection");
        }
        result
    }
}
