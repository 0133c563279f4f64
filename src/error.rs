//! Error types for weekchores
//!
//! Nothing here is fatal to the process. The binary maps every error to a
//! single human-readable line and a non-zero exit code.

use thiserror::Error;

/// Exit codes for the weekchores CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for weekchores operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // Rejected transitions (exit code 3)
    #[error("Cannot {action} task {id} while it is {state}")]
    InvalidTransition {
        id: String,
        state: String,
        action: &'static str,
    },

    // Operation failures (exit code 4)
    #[error("Persistence gateway is not available")]
    GatewayUnavailable,

    #[error("Write failed: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidConfig(_) | Error::NotFound { .. } => {
                exit_codes::USER_ERROR
            }

            Error::InvalidTransition { .. } => exit_codes::REJECTED,

            Error::GatewayUnavailable
            | Error::Write(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for weekchores operations
pub type Result<T> = std::result::Result<T, Error>;
