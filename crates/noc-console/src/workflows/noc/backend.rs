use async_trait::async_trait;

use super::domain::{Application, ApplicationId};
use super::recipients::ForwardPayload;

/// REST surface of the authority backend consumed by the review workflow.
///
/// Transition calls return the backend's copy of the application when the
/// response carries one; `None` means the backend confirmed without echoing it.
#[async_trait]
pub trait NocBackend: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError>;

    async fn application_details(&self, id: &ApplicationId) -> Result<Application, BackendError>;

    /// One call carrying every department and district; the backend fans out.
    async fn forward(
        &self,
        id: &ApplicationId,
        payload: &ForwardPayload,
    ) -> Result<Option<Application>, BackendError>;

    async fn reject(
        &self,
        id: &ApplicationId,
        remarks: &str,
    ) -> Result<Option<Application>, BackendError>;
}

/// Failure talking to the backend. Each attempt is final; nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("backend rejected the request with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("backend route {route} not found")]
    MissingRoute { route: String },
    /// Identifier that cannot be placed in a request path; never sent.
    #[error("'{id}' is not a usable record id")]
    InvalidId { id: String },
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: Some(message.into()),
        }
    }

    /// Message shown to the operator. The backend's own wording wins when present.
    pub fn operator_message(&self, generic: &str) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Rejected { .. } => generic.to_string(),
            Self::MissingRoute { route } => format!(
                "The backend endpoint {route} was not found. This is a deployment or \
                 configuration problem, not an issue with the application; contact the \
                 system administrator."
            ),
            Self::Transport(_) => {
                format!("{generic} The backend could not be reached; check the connection and retry.")
            }
            Self::Malformed(_) => {
                format!("{generic} The backend returned an unexpected response.")
            }
            Self::InvalidId { id } => format!("{generic} '{id}' is not a valid record id."),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Malformed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERIC: &str = "Failed to forward the application.";

    #[test]
    fn backend_wording_is_shown_verbatim() {
        let error = BackendError::rejected(409, "Application already closed by DM Patna");
        assert_eq!(
            error.operator_message(GENERIC),
            "Application already closed by DM Patna"
        );
    }

    #[test]
    fn missing_route_is_distinct_from_generic_failures() {
        let missing = BackendError::MissingRoute {
            route: "POST /applications/a1/forward".to_string(),
        };
        let generic = BackendError::Rejected {
            status: 500,
            message: None,
        };

        let missing_message = missing.operator_message(GENERIC);
        assert!(missing_message.contains("POST /applications/a1/forward"));
        assert!(missing_message.contains("configuration"));
        assert_eq!(generic.operator_message(GENERIC), GENERIC);
        assert_ne!(missing_message, generic.operator_message(GENERIC));
    }

    #[test]
    fn transport_failures_keep_the_generic_prefix() {
        let error = BackendError::Transport("connection refused".to_string());
        assert!(error.is_transport());
        assert!(error.operator_message(GENERIC).starts_with(GENERIC));
    }
}
