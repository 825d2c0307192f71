//! # sqlcmd-script
//!
//! Pure processing of SQLCMD-style schema scripts, as produced by SQL Server
//! database projects and `sqlpackage` publish scripts.
//!
//! This crate is intentionally IO-agnostic. It turns raw script text into
//! values that a deployment layer can act on:
//!
//! - [`SchemaScript`]: normalized script text (SQLCMD directives stripped,
//!   template tokens resolved)
//! - [`Fingerprint`]: a content hash used as a deployment identity key
//! - [`CommandUnit`]: one `GO`-separated batch ready to send to the server
//! - [`clear_tables_script`]: a three-pass batch that empties a set of tables
//!
//! ## Example
//!
//! ```
//! use sqlcmd_script::SchemaScript;
//!
//! let script = SchemaScript::new(
//!     ":setvar DatabaseName \"demo\"\n\
//!      CREATE TABLE [dbo].[Users] (Id INT);\n\
//!      GO\n\
//!      PRINT N'done';\n\
//!      GO\n",
//! );
//!
//! let units = script.command_units();
//! assert_eq!(units.len(), 1);
//! assert_eq!(script.created_tables(), vec!["[dbo].[Users]".to_string()]);
//! assert_eq!(script.fingerprint().as_str().len(), 64);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod clear;
pub mod error;
pub mod fingerprint;
pub mod script;
pub mod splitter;

pub use clear::{clear_tables_script, validate_table_identifier};
pub use error::{Result, ScriptError};
pub use fingerprint::{Fingerprint, fingerprint};
pub use script::{
    DATABASE_NAME_TOKEN, MAX_DATABASE_NAME_LEN, SCRIPT_DIRECTIVE_PREFIX, SQLCMD_ENABLED_TOKEN,
    SchemaScript,
};
pub use splitter::{BATCH_SEPARATOR, CommandUnit, IGNORED_STATEMENT_PREFIXES, split};
