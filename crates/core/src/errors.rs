//! Core error types for Stockfolio.
//!
//! The taxonomy mirrors how failures are handled by callers:
//! - [`Error::Authentication`]: credential exchange failed. Fatal for that
//!   connect attempt and never retried.
//! - [`Error::Broker`]: any operational failure talking to a vendor (network,
//!   timeout, malformed payload, worker exit, vendor business error).
//! - [`Error::Persistence`]: a token or data store write failed.
//!
//! Storage-specific errors (Diesel, SQLite) are converted into
//! [`DatabaseError`] by the storage layer so this crate stays database-agnostic.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to load configuration: {0}")]
    ConfigIO(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns true when the error came from a broker or its worker process.
    pub fn is_broker(&self) -> bool {
        matches!(self, Error::Broker(_))
    }

    /// Returns true when the error was raised by a failed credential exchange.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    /// Returns true for failures of the token or data store.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_) | Error::Database(_))
    }
}

/// Operational failures reported by broker clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No client is registered under the given name.
    #[error("Broker '{0}' is not registered")]
    UnknownBroker(String),

    /// The client has not been connected yet and could not connect lazily.
    #[error("Broker '{0}' is not connected")]
    NotConnected(String),

    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The vendor answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The call did not finish within its time bound.
    #[error("{0} timeout")]
    Timeout(String),

    /// The payload could not be decoded into the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The vendor processed the request and rejected it.
    #[error("Vendor rejected request: {0}")]
    Vendor(String),

    /// The worker process exited abnormally.
    #[error("Worker exited with code {code:?}: {detail}")]
    Worker { code: Option<i32>, detail: String },

    /// The worker ran but reported `success: false`.
    #[error("Worker reported failure: {0}")]
    WorkerFailed(String),

    /// The capability is not offered by this integration.
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

impl BrokerError {
    /// Whether the failure is transport-level and may be retried.
    ///
    /// Vendor business rejections, malformed payloads and worker failures are
    /// never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            BrokerError::Transport(_) | BrokerError::Timeout(_) => true,
            BrokerError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for configuration and input parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
