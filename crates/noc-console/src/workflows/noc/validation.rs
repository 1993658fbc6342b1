use super::catalog::RecipientKind;
use super::domain::ApplicationStatus;
use super::lifecycle::Transition;

/// Operator input that violates a precondition. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("select at least one department or district before forwarding")]
    EmptyRecipients,
    #[error("remarks are required to reject an application")]
    EmptyRemarks,
    #[error("{kind} {id} is not part of recipient catalog {catalog_version}")]
    UnknownRecipient {
        kind: RecipientKind,
        id: u32,
        catalog_version: String,
    },
    #[error("cannot {} an application that is already {status}", .transition.verb())]
    TerminalState {
        status: ApplicationStatus,
        transition: Transition,
    },
}

/// Trimmed remarks, or [`ValidationError::EmptyRemarks`] when nothing is left.
pub(crate) fn require_remarks(remarks: &str) -> Result<String, ValidationError> {
    let trimmed = remarks.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyRemarks);
    }
    Ok(trimmed.to_string())
}
