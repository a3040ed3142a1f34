//! Error type shared by the fake service, its directory, and the predicate composer.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = FakeServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FakeServiceError {
    #[error("ServiceId in use: {0}")]
    DuplicateServiceId(String),
    #[error("Service {0} not registered")]
    NotRegistered(String),
    #[error("Base address already set")]
    BaseAddressAlreadySet,
    #[error("Request body could not be read as {target}: {source}")]
    MalformedBody {
        target: String,
        #[source]
        source: serde_json::Error,
    },
    /// Raised at teardown; the message is the full list of requests that never arrived.
    #[error("{0}")]
    UnmetExpectations(String),
    #[error("Failed to bind {host}: {source}")]
    Bind {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start server runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Invalid base address: {0}")]
    InvalidBaseAddress(String),
    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("Failed to serialize response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl FakeServiceError {
    pub(crate) fn malformed_body(target: impl Into<String>, source: serde_json::Error) -> Self {
        FakeServiceError::MalformedBody {
            target: target.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_messages() {
        assert_eq!(
            FakeServiceError::DuplicateServiceId("billing".to_string()).to_string(),
            "ServiceId in use: billing"
        );
        assert_eq!(
            FakeServiceError::NotRegistered("billing".to_string()).to_string(),
            "Service billing not registered"
        );
    }

    #[test]
    fn test_malformed_body_keeps_parse_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FakeServiceError::malformed_body("body<json>", source);
        let message = err.to_string();
        assert!(message.starts_with("Request body could not be read as body<json>"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
