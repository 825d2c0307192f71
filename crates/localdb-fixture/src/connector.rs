//! Database connection seam.
//!
//! Deployment logic talks to the server only through [`Connector`] and
//! [`Connection`]. [`MssqlConnector`] is the production implementation on top
//! of `mssql-client`; tests substitute an in-memory server.

use std::time::Duration;

use async_trait::async_trait;
use mssql_client::{Client, Config, Ready};

use crate::connection_string::ConnectionString;
use crate::error::Result;

/// A database to connect to: connection string plus the database it addresses.
///
/// The database name is carried separately because an attach-file connection
/// string has no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Resolved connection string.
    pub connection_string: ConnectionString,
    /// Database the connection should land in.
    pub database: String,
}

impl Endpoint {
    /// Resolve `base` for `database`.
    #[must_use]
    pub fn resolve(base: &ConnectionString, database: &str) -> Self {
        Self {
            connection_string: base.for_database(database),
            database: database.to_string(),
        }
    }
}

/// Opens connections to an [`Endpoint`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>>;
}

/// An open connection able to run SQL batches.
#[async_trait]
pub trait Connection: Send {
    /// Execute one batch, discarding any rows it returns.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Close the connection gracefully.
    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// [`Connector`] backed by the `mssql-client` driver.
#[derive(Debug, Clone)]
pub struct MssqlConnector {
    application_name: String,
    connect_timeout: Option<Duration>,
}

impl Default for MssqlConnector {
    fn default() -> Self {
        Self {
            application_name: "localdb-fixture".to_string(),
            connect_timeout: None,
        }
    }
}

impl MssqlConnector {
    /// Create a connector with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name reported to the server.
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Override the connect timeout from the connection string.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the driver configuration for `endpoint`.
    pub fn config(&self, endpoint: &Endpoint) -> Result<Config> {
        let mut config = Config::from_connection_string(&endpoint.connection_string.to_string())?
            .database(endpoint.database.as_str())
            .application_name(self.application_name.as_str());

        if let Some(timeout) = self.connect_timeout {
            config = config.connect_timeout(timeout);
        }

        Ok(config)
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>> {
        let config = self.config(endpoint)?;
        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %endpoint.database,
            "opening connection"
        );
        let client = Client::connect(config).await?;
        Ok(Box::new(MssqlConnection { client }))
    }
}

struct MssqlConnection {
    client: Client<Ready>,
}

#[async_trait]
impl Connection for MssqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.client.simple_query(sql).await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.client.close().await?;
        Ok(())
    }
}
