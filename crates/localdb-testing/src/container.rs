//! Disposable SQL Server for deployment tests.

use localdb_fixture::ConnectionString;
use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Port SQL Server listens on inside the container.
pub const SQL_SERVER_PORT: u16 = 1433;

const IMAGE: &str = "mcr.microsoft.com/mssql/server";
const TAG: &str = "2022-latest";
const SA_PASSWORD: &str = "Fixture_Passw0rd!";

/// SQL Server 2022 Developer edition, logged into as `sa`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerContainer;

impl SqlServerContainer {
    /// Create the image description.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Base connection string for the container mapped to `host:port`.
    pub fn connection_string(&self, host: &str, port: u16) -> localdb_fixture::Result<ConnectionString> {
        ConnectionString::custom(&format!(
            "Server={host},{port};User Id=sa;Password={SA_PASSWORD};TrustServerCertificate=true;Encrypt=false"
        ))
    }
}

impl Image for SqlServerContainer {
    fn name(&self) -> &str {
        IMAGE
    }

    fn tag(&self) -> &str {
        TAG
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout(
            "SQL Server is now ready for client connections",
        )]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        [("ACCEPT_EULA", "Y"), ("MSSQL_SA_PASSWORD", SA_PASSWORD)]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(SQL_SERVER_PORT)]
    }
}
