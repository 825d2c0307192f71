//! # localdb-testing
//!
//! Test infrastructure for running `localdb-fixture` against a real SQL Server.
//!
//! ## Features
//!
//! - SQL Server container image for testcontainers
//! - Live-server settings from `MSSQL_*` environment variables
//! - A small relational sample schema in publish-script form
//!
//! ## Example
//!
//! ```rust,ignore
//! use localdb_testing::{LiveServer, fixtures};
//! use localdb_fixture::{DbParams, DbWrapper};
//!
//! #[tokio::test]
//! #[ignore = "Requires SQL Server"]
//! async fn deploys() {
//!     let server = LiveServer::from_env().expect("MSSQL_HOST not set");
//!     let db = DbWrapper::new(DbParams::new(
//!         server.connection_string().unwrap(),
//!         fixtures::sample_schema(),
//!         "fixture-tests",
//!         true,
//!     ))
//!     .unwrap();
//!     db.deploy_schema().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;

pub use container::SqlServerContainer;
pub use fixtures::{LiveServer, TestDatabase};
