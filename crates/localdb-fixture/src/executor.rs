//! Sequential batch execution with per-unit failure isolation.

use sqlcmd_script::CommandUnit;

use crate::connector::{Connector, Endpoint};
use crate::error::Result;
use crate::marker::MarkerOutcome;

/// Outcome of one command unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The batch ran without error.
    Succeeded,
    /// The server rejected the batch; execution moved on to the next one.
    Failed {
        /// Server error number, when the failure came from the server.
        number: Option<i32>,
        /// Error message.
        message: String,
    },
}

/// Outcome of one command unit, tagged with its source batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    /// Zero-based source batch index.
    pub batch: usize,
    /// What happened.
    pub outcome: UnitOutcome,
}

impl UnitReport {
    /// Whether the unit ran without error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, UnitOutcome::Succeeded)
    }
}

/// Everything a deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// One entry per executed unit, in execution order.
    pub units: Vec<UnitReport>,
    /// Whether the deployment marker was recorded.
    pub marker: MarkerOutcome,
}

impl ExecutionReport {
    /// Number of units that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.units.iter().filter(|u| u.succeeded()).count()
    }

    /// Units that failed.
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| !u.succeeded())
    }

    /// Whether every unit succeeded and the marker was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none() && self.marker.is_recorded()
    }
}

/// Runs command units over a single connection.
pub struct ScriptExecutor<'a, C: ?Sized> {
    connector: &'a C,
}

impl<'a, C: Connector + ?Sized> ScriptExecutor<'a, C> {
    /// Create an executor.
    pub fn new(connector: &'a C) -> Self {
        Self { connector }
    }

    /// Execute `units` in order against `endpoint`.
    ///
    /// A failing unit is logged and recorded; execution continues with the
    /// next one. There is no surrounding transaction, so a failure leaves the
    /// preceding units applied. Only failing to open the connection is an
    /// error.
    pub async fn execute(&self, units: &[CommandUnit], endpoint: &Endpoint) -> Result<Vec<UnitReport>> {
        let mut conn = self.connector.connect(endpoint).await?;
        let mut reports = Vec::with_capacity(units.len());

        for unit in units {
            tracing::debug!(batch = unit.batch(), "executing command unit");

            let outcome = match conn.execute(unit.sql()).await {
                Ok(()) => UnitOutcome::Succeeded,
                Err(e) => {
                    tracing::warn!(
                        batch = unit.batch(),
                        error = %e,
                        "command unit failed, continuing"
                    );
                    UnitOutcome::Failed {
                        number: e.server_number(),
                        message: e.to_string(),
                    }
                }
            };

            reports.push(UnitReport {
                batch: unit.batch(),
                outcome,
            });
        }

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing script connection");
        }

        Ok(reports)
    }
}
