use std::{error::Error, fmt::Display};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an anvyl-related operation.
pub type AnvylResult<T> = Result<T, AnvylError>;

/// An error that occurred during an anvyl operation.
///
/// Adapters classify their library-specific failures into these kinds at
/// their boundary; callers above the boundary only ever match on this enum.
/// HTTP status mapping happens at the service edge, not here.
#[derive(Debug, Error)]
pub enum AnvylError {
    /// Bad input: malformed JSON, unknown enum value, missing field.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced host, container, or PID does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An operation would break a structural invariant, e.g. deleting the
    /// local host or starting an already-running service.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The Docker engine socket is unreachable or timed out.
    #[error("docker engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The model provider timed out or returned a server error.
    #[error("model provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The supervisor failed to spawn a service process.
    #[error("failed to spawn {service}: {message}")]
    SpawnError {
        /// The service that failed to start.
        service: String,

        /// Why the spawn failed, including recent log output when available.
        message: String,
    },

    /// An error from the database layer.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// An error running database migrations.
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error from an outbound HTTP call.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A JSON serialization or deserialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Any unclassified failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl AnvylError {
    /// Creates a new `Custom` error from any error type.
    pub fn custom(error: impl Into<anyhow::Error>) -> AnvylError {
        AnvylError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Creates a `Validation` error.
    pub fn validation(message: impl Into<String>) -> AnvylError {
        AnvylError::Validation(message.into())
    }

    /// Creates a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> AnvylError {
        AnvylError::NotFound(message.into())
    }

    /// Creates a `Conflict` error.
    pub fn conflict(message: impl Into<String>) -> AnvylError {
        AnvylError::Conflict(message.into())
    }

    /// A short kind tag used in CLI error summaries and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AnvylError::Validation(_) => "Validation",
            AnvylError::NotFound(_) => "NotFound",
            AnvylError::Conflict(_) => "Conflict",
            AnvylError::Invariant(_) => "Invariant",
            AnvylError::EngineUnavailable(_) => "EngineUnavailable",
            AnvylError::ProviderUnavailable(_) => "ProviderUnavailable",
            AnvylError::SpawnError { .. } => "SpawnError",
            AnvylError::Database(_) => "Database",
            AnvylError::Migration(_) => "Migration",
            AnvylError::Io(_) => "Io",
            AnvylError::Http(_) => "Http",
            AnvylError::Json(_) => "Json",
            AnvylError::Internal(_) => "Internal",
            AnvylError::Custom(_) => "Internal",
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `AnvylResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> AnvylResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_tags() {
        assert_eq!(AnvylError::validation("bad").kind(), "Validation");
        assert_eq!(AnvylError::not_found("x").kind(), "NotFound");
        assert_eq!(AnvylError::conflict("x").kind(), "Conflict");
        assert_eq!(
            AnvylError::EngineUnavailable("socket".into()).kind(),
            "EngineUnavailable"
        );
        let spawn = AnvylError::SpawnError {
            service: "infra".into(),
            message: "exit 1".into(),
        };
        assert_eq!(spawn.kind(), "SpawnError");
    }

    #[test]
    fn test_spawn_error_display_includes_service() {
        let err = AnvylError::SpawnError {
            service: "agent".into(),
            message: "no such file".into(),
        };
        assert_eq!(err.to_string(), "failed to spawn agent: no such file");
    }
}
