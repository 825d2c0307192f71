//! Deployment markers.
//!
//! A marker is an empty table in the target database whose name embeds the
//! schema fingerprint. Its existence means "this schema has been deployed
//! here"; it is created once and never updated.

use sqlcmd_script::Fingerprint;

use crate::config::ProbePolicy;
use crate::connector::{Connector, Endpoint};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Schema and name prefix of marker tables.
pub const MARKER_TABLE_PREFIX: &str = "dbo.SchemaHash_";

/// Marker table name for a fingerprint.
#[must_use]
pub fn marker_table_name(fingerprint: &Fingerprint) -> String {
    format!("{MARKER_TABLE_PREFIX}{fingerprint}")
}

/// Result of trying to record a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerOutcome {
    /// The marker table now exists.
    Recorded,
    /// Every round failed; the next deployment will run the script again.
    NotRecorded {
        /// Error from the last round.
        reason: String,
    },
}

impl MarkerOutcome {
    /// Whether the marker exists after recording.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Checks for and records deployment markers in one target database.
pub struct MarkerStore<'a, C: ?Sized> {
    connector: &'a C,
    endpoint: &'a Endpoint,
    retry: &'a RetryPolicy,
    probe_policy: ProbePolicy,
}

impl<'a, C: Connector + ?Sized> MarkerStore<'a, C> {
    /// Create a store for the database addressed by `endpoint`.
    pub fn new(
        connector: &'a C,
        endpoint: &'a Endpoint,
        retry: &'a RetryPolicy,
        probe_policy: ProbePolicy,
    ) -> Self {
        Self {
            connector,
            endpoint,
            retry,
            probe_policy,
        }
    }

    /// Check whether the marker for `fingerprint` exists.
    ///
    /// A missing table or a missing database means "not deployed". Any other
    /// failure is resolved by the [`ProbePolicy`].
    pub async fn exists(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let table = marker_table_name(fingerprint);

        let probe = async {
            let mut conn = self.connector.connect(self.endpoint).await?;
            let result = conn.execute(&format!("SELECT * FROM {table}")).await;
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "error closing marker probe connection");
            }
            result
        }
        .await;

        match probe {
            Ok(()) => Ok(true),
            Err(e) if e.is_object_not_found() || e.is_database_unavailable() => {
                tracing::debug!(table = %table, error = %e, "deployment marker not found");
                Ok(false)
            }
            Err(e) => match self.probe_policy {
                ProbePolicy::AssumeNotDeployed => {
                    tracing::warn!(
                        table = %table,
                        error = %e,
                        "deployment marker probe failed, assuming not deployed"
                    );
                    Ok(false)
                }
                ProbePolicy::FailClosed => Err(Error::MarkerProbe {
                    table,
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Create the marker for `fingerprint`, waiting for the database to
    /// accept connections.
    ///
    /// The connection is retried per the policy's attempts while the failure
    /// is transient (see [`Error::is_transient`]). A round that
    /// fails (connection wait exhausted, or the `CREATE TABLE` itself failing)
    /// is logged and repeated up to the policy's rounds. Never fails: an
    /// unrecorded marker only means the schema will be deployed again.
    pub async fn record(&self, fingerprint: &Fingerprint) -> MarkerOutcome {
        let table = marker_table_name(fingerprint);
        let mut last_error = String::new();

        for round in 0..self.retry.max_rounds {
            let delay = self.retry.delay_before(round);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.record_once(&table).await {
                Ok(()) => {
                    tracing::debug!(table = %table, round = round, "deployment marker recorded");
                    return MarkerOutcome::Recorded;
                }
                Err(e) => {
                    tracing::warn!(
                        table = %table,
                        round = round + 1,
                        max_rounds = self.retry.max_rounds,
                        error = %e,
                        "failed to record deployment marker"
                    );
                    last_error = e.to_string();
                }
            }
        }

        MarkerOutcome::NotRecorded { reason: last_error }
    }

    async fn record_once(&self, table: &str) -> Result<()> {
        let mut conn = self
            .retry
            .run_while("marker connection", Error::is_transient, |_| {
                self.connector.connect(self.endpoint)
            })
            .await
            .map_err(|exhausted| Error::MarkerUnavailable {
                table: table.to_string(),
                attempts: exhausted.attempts,
                message: exhausted.last_error.to_string(),
            })?;

        let result = conn.execute(&format!("CREATE TABLE {table} (Id INT)")).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing marker connection");
        }

        match result {
            // Another process recorded the same fingerprint first.
            Err(e) if e.is_object_already_exists() => Ok(()),
            other => other,
        }
    }
}
