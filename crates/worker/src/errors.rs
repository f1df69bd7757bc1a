use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("A command is required")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("An account number is required for {0}")]
    MissingAccount(String),

    #[error("Vendor session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Login request failed with code {0}")]
    LoginRequestFailed(i32),

    #[error("Login rejected with code {0}")]
    LoginRejected(i32),

    #[error("Login timeout after {0}s")]
    LoginTimeout(u64),

    #[error("Request {name} failed with code {code}")]
    RequestFailed { name: String, code: i32 },

    #[error("Request timeout: {0}")]
    RequestTimeout(String),

    #[error("Request {name} returned an unexpected TR {tr_code}")]
    UnexpectedTr { name: String, tr_code: String },
}
