//! Live-server settings and sample schemas.

use localdb_fixture::{ConnectionString, Connector, Endpoint, MssqlConnector};
use sqlcmd_script::SchemaScript;

/// Publish-script shaped schema with a foreign key between its two tables.
pub const SAMPLE_SCHEMA: &str = r#"/*
Deployment script for FixtureSample
*/
:setvar DatabaseName "FixtureSample"
:on error exit
GO
IF N'$(__IsSqlCmdEnabled)' NOT LIKE N'True'
    BEGIN
        PRINT N'SQLCMD mode must be enabled to successfully execute this script.';
        SET NOEXEC ON;
    END
GO
IF NOT EXISTS (SELECT 1 FROM sys.databases WHERE name = N'$(DatabaseName)')
    CREATE DATABASE [$(DatabaseName)];
GO
USE [$(DatabaseName)];
GO
PRINT N'Creating [dbo].[Customer]...';
GO
CREATE TABLE [dbo].[Customer] (
    [Id]   INT            IDENTITY (1, 1) NOT NULL,
    [Name] NVARCHAR (100) NOT NULL,
    CONSTRAINT [PK_Customer] PRIMARY KEY CLUSTERED ([Id] ASC)
);
GO
PRINT N'Creating [dbo].[Order]...';
GO
CREATE TABLE [dbo].[Order] (
    [Id]         INT IDENTITY (1, 1) NOT NULL,
    [CustomerId] INT NOT NULL,
    CONSTRAINT [PK_Order] PRIMARY KEY CLUSTERED ([Id] ASC),
    CONSTRAINT [FK_Order_Customer] FOREIGN KEY ([CustomerId]) REFERENCES [dbo].[Customer] ([Id])
);
GO
GRANT SELECT ON [dbo].[Order] TO [reporting];
GO
PRINT N'Update complete.';
GO
"#;

/// The sample schema, normalized.
#[must_use]
pub fn sample_schema() -> SchemaScript {
    SchemaScript::new(SAMPLE_SCHEMA)
}

/// SQL Server reachable from the test process, configured from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveServer {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// SQL login.
    pub user: String,
    /// SQL login password.
    pub password: String,
    /// Whether to require TLS.
    pub encrypt: bool,
}

impl LiveServer {
    /// Read `MSSQL_HOST` (required), `MSSQL_PORT`, `MSSQL_USER`,
    /// `MSSQL_PASSWORD` and `MSSQL_ENCRYPT`.
    ///
    /// Returns `None` when `MSSQL_HOST` is not set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("MSSQL_HOST").ok()?;
        let port = std::env::var("MSSQL_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(1433);
        let user = std::env::var("MSSQL_USER").unwrap_or_else(|_| "sa".into());
        let password =
            std::env::var("MSSQL_PASSWORD").unwrap_or_else(|_| "MyStrongPassw0rd".into());
        let encrypt = std::env::var("MSSQL_ENCRYPT")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Some(Self {
            host,
            port,
            user,
            password,
            encrypt,
        })
    }

    /// Base connection string for this server.
    pub fn connection_string(&self) -> localdb_fixture::Result<ConnectionString> {
        ConnectionString::custom(&format!(
            "Server={},{};User Id={};Password={};TrustServerCertificate=true;Encrypt={}",
            self.host, self.port, self.user, self.password, self.encrypt
        ))
    }
}

/// A database created for one test run, dropped explicitly afterwards.
#[derive(Debug, Clone)]
pub struct TestDatabase {
    /// Database name.
    pub database: String,
}

impl TestDatabase {
    /// Name a database after `prefix` and the current process, so parallel
    /// test binaries do not share it.
    #[must_use]
    pub fn unique(prefix: &str) -> Self {
        Self {
            database: format!("{prefix}-{}", std::process::id()),
        }
    }

    /// Generate SQL to drop the database, closing other sessions first.
    #[must_use]
    pub fn drop_database_sql(&self) -> String {
        format!(
            "IF EXISTS (SELECT * FROM sys.databases WHERE name = N'{db}')
             BEGIN
                 ALTER DATABASE [{db}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE;
                 DROP DATABASE [{db}];
             END",
            db = self.database.replace('\'', "''")
        )
    }

    /// Drop the database on `server`.
    pub async fn drop(&self, server: &ConnectionString) -> localdb_fixture::Result<()> {
        let endpoint = Endpoint::resolve(server, "master");
        let mut conn = MssqlConnector::new().connect(&endpoint).await?;
        conn.execute(&self.drop_database_sql()).await?;
        conn.close().await
    }
}
