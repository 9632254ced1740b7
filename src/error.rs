// src/error.rs
//! Error taxonomy shared by the service client, the session store and the
//! workflow controller.

use serde::Serialize;
use thiserror::Error;

/// Failure of a single round trip to the video service.
///
/// Kept `Clone` so a failure can be held inside `WorkflowState::Failed`
/// and rendered later.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ApiError {
    /// Token missing, expired or rejected (401/403).
    #[error("Authentication failed: {0}")]
    Auth(String),
    /// Malformed input, caught locally or rejected by the server.
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The service accepted the request but failed to process it.
    #[error("Video service error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    RemoteService { status: Option<u16>, message: String },
    /// The request never completed.
    #[error("Network error: {0}")]
    Network(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::RemoteService {
                status: err.status().map(|s| s.as_u16()),
                message: format!("Malformed response: {}", err),
            }
        } else if err.is_timeout() {
            ApiError::Network(format!("Request timed out: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Outcome of a workflow trigger that did not produce a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A call is already in flight; the trigger was ignored.
    #[error("Ignored {action}: another request is still in flight")]
    Busy { action: &'static str },
    /// The trigger is not valid from the current state.
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    /// The response arrived after its job was replaced and was dropped.
    #[error("Discarded {action} result: the job was superseded")]
    Superseded {
        action: &'static str,
        job_id: Option<String>,
    },
}

impl WorkflowError {
    /// True for failures detected on the client without a network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkflowError::Api(ApiError::Validation(_))
                | WorkflowError::Busy { .. }
                | WorkflowError::InvalidState { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, WorkflowError::Api(ApiError::Auth(_)))
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Union used by the auth helpers and the command line.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_service_message_includes_status() {
        let err = ApiError::RemoteService {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Video service error (502): bad gateway");

        let err = ApiError::RemoteService {
            status: None,
            message: "truncated".to_string(),
        };
        assert_eq!(err.to_string(), "Video service error: truncated");
    }

    #[test]
    fn test_validation_classification() {
        assert!(WorkflowError::Busy { action: "apply filter" }.is_validation());
        assert!(WorkflowError::from(ApiError::validation("empty url")).is_validation());
        assert!(!WorkflowError::from(ApiError::Network("reset".into())).is_validation());
        assert!(WorkflowError::from(ApiError::Auth("expired".into())).is_auth());
    }
}
