//! # localdb-fixture
//!
//! Provision a SQL Server test database from a schema script, once per schema
//! version, and reset its tables between tests.
//!
//! ## Deployment protocol
//!
//! ```text
//! fingerprint(script) -> resolve database name -> marker exists?
//!     yes: skip
//!     no:  split into GO batches -> execute each on master -> record marker
//! ```
//!
//! - The fingerprint is a SHA-256 digest of the normalized script. With
//!   `use_schema_hash_suffix`, it is appended to the database name so each
//!   schema version gets its own database.
//! - The marker is a table named `dbo.SchemaHash_<fingerprint>` in the
//!   target database.
//! - Each batch runs independently. Failures (for example `GRANT`s to
//!   principals that only exist in production) are logged and reported,
//!   never raised.
//! - Recording the marker waits for the freshly created database with a
//!   bounded [`RetryPolicy`]. Races with parallel test processes are
//!   tolerated: duplicate objects are harmless and a marker that cannot be
//!   recorded only means the next run deploys again.
//!
//! There is no lock between processes. Two runners starting at once may both
//! run the script; the second one's `CREATE` statements fail and are
//! reported as failed units.
//!
//! ## Example
//!
//! ```rust,ignore
//! use localdb_fixture::{ConnectionString, DbParams, DbWrapper};
//! use sqlcmd_script::SchemaScript;
//!
//! #[tokio::test]
//! async fn orders_are_persisted() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = DbWrapper::new(DbParams::new(
//!         ConnectionString::custom("Server=localhost,1433;User Id=sa;Password=secret;")?,
//!         SchemaScript::new(include_str!("../db/schema.sql")),
//!         "orders-tests",
//!         true,
//!     ))?;
//!
//!     db.deploy_schema().await?;
//!     db.clear_tables(db.created_tables()).await?;
//!
//!     // Connect with db.connection_string() and run the test...
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection_string;
pub mod connector;
pub mod error;
pub mod executor;
pub mod marker;
pub mod retry;
pub mod wrapper;

pub use config::{DbParams, ProbePolicy, load_schema};
pub use connection_string::{ConnectionString, LocalDbVersion};
pub use connector::{Connection, Connector, Endpoint, MssqlConnector};
pub use error::{Error, Result};
pub use executor::{ExecutionReport, ScriptExecutor, UnitOutcome, UnitReport};
pub use marker::{MarkerOutcome, MarkerStore, marker_table_name};
pub use retry::{Backoff, RetryExhausted, RetryPolicy};
pub use sqlcmd_script::{CommandUnit, Fingerprint, SchemaScript};
pub use wrapper::{DbWrapper, DeploymentOutcome};
