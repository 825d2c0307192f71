//! Fixture error types.

use thiserror::Error;

/// SQL Server error 208: invalid object name.
pub const OBJECT_NOT_FOUND: i32 = 208;

/// SQL Server error 2714: an object with this name already exists.
pub const OBJECT_ALREADY_EXISTS: i32 = 2714;

/// SQL Server error 4060: cannot open the database requested by the login.
pub const CANNOT_OPEN_DATABASE: i32 = 4060;

/// SQL Server error 911: database does not exist.
pub const DATABASE_DOES_NOT_EXIST: i32 = 911;

/// Errors that can occur while provisioning a test database.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    ConnectionString(String),

    /// Fixture configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The server could not be reached or the login failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server rejected a statement.
    #[error("server error {number}: {message}")]
    Server {
        /// Error number.
        number: i32,
        /// Error class/severity (0-25).
        class: u8,
        /// Error message.
        message: String,
    },

    /// Script preparation failed.
    #[error(transparent)]
    Script(#[from] sqlcmd_script::ScriptError),

    /// The target database never accepted a connection for the marker table.
    #[error("marker table {table} unavailable after {attempts} attempts: {message}")]
    MarkerUnavailable {
        /// Marker table name.
        table: String,
        /// Connection attempts made.
        attempts: u32,
        /// Last error seen.
        message: String,
    },

    /// The deployment marker could not be probed and the probe policy fails closed.
    #[error("could not determine whether {table} exists: {message}")]
    MarkerProbe {
        /// Marker table name.
        table: String,
        /// Underlying error.
        message: String,
    },

    /// IO error, e.g. while reading a schema file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the server reported a missing object (error 208).
    #[must_use]
    pub fn is_object_not_found(&self) -> bool {
        self.is_server_error(OBJECT_NOT_FOUND)
    }

    /// Check if the server reported a name collision (error 2714).
    #[must_use]
    pub fn is_object_already_exists(&self) -> bool {
        self.is_server_error(OBJECT_ALREADY_EXISTS)
    }

    /// Check if the requested database does not exist or cannot be opened yet.
    #[must_use]
    pub fn is_database_unavailable(&self) -> bool {
        self.is_server_error(CANNOT_OPEN_DATABASE) || self.is_server_error(DATABASE_DOES_NOT_EXIST)
    }

    /// Check if this is a server error with a specific number.
    #[must_use]
    pub fn is_server_error(&self, number: i32) -> bool {
        matches!(self, Self::Server { number: n, .. } if *n == number)
    }

    /// Check if this error may resolve itself on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_)) || self.is_database_unavailable()
    }

    /// Server error number, if this is a server error.
    #[must_use]
    pub fn server_number(&self) -> Option<i32> {
        match self {
            Self::Server { number, .. } => Some(*number),
            _ => None,
        }
    }
}

impl From<mssql_client::Error> for Error {
    fn from(err: mssql_client::Error) -> Self {
        match err {
            mssql_client::Error::Server {
                number,
                class,
                message,
                ..
            } => Self::Server {
                number,
                class,
                message,
            },
            mssql_client::Error::Config(message) => Self::ConnectionString(message),
            other => Self::Connection(other.to_string()),
        }
    }
}

/// Result type for fixture operations.
pub type Result<T> = std::result::Result<T, Error>;
