use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationId, ApplicationStatus};
use super::recipients::ForwardPayload;
use super::validation::ValidationError;

/// Transitions the console is allowed to drive. Approval arrives from the backend only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Forward,
    Reject,
}

impl Transition {
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reject => "reject",
        }
    }

    /// Status the application holds once the backend confirms the transition.
    pub const fn target(self) -> ApplicationStatus {
        match self {
            Self::Forward => ApplicationStatus::Forwarded,
            Self::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Legal-move table for a single NOC application.
///
/// ```text
/// Submitted --forward--> Forwarded --forward--> Forwarded
///     |                      |
///     +------reject----------+--> Rejected
///                            +..> Approved   (backend only)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationStateMachine;

impl ApplicationStateMachine {
    pub fn permits(status: ApplicationStatus, transition: Transition) -> bool {
        match (status, transition) {
            (ApplicationStatus::Submitted, Transition::Forward | Transition::Reject) => true,
            // Re-forwarding to additional recipients does not leave Forwarded.
            (ApplicationStatus::Forwarded, Transition::Forward | Transition::Reject) => true,
            (ApplicationStatus::Approved | ApplicationStatus::Rejected, _) => false,
        }
    }

    pub fn check(application: &Application, transition: Transition) -> Result<(), ValidationError> {
        if Self::permits(application.status, transition) {
            Ok(())
        } else {
            Err(ValidationError::TerminalState {
                status: application.status,
                transition,
            })
        }
    }

    /// Whether a status reported by the backend is reachable from the cached one.
    pub fn accepts_remote(current: ApplicationStatus, remote: ApplicationStatus) -> bool {
        match current {
            ApplicationStatus::Submitted => true,
            ApplicationStatus::Forwarded => remote != ApplicationStatus::Submitted,
            ApplicationStatus::Approved | ApplicationStatus::Rejected => remote == current,
        }
    }
}

/// History entry written after the backend confirms a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub application_id: ApplicationId,
    pub application_number: String,
    pub transition: Transition,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub departments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub districts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl TransitionRecord {
    pub(crate) fn forwarded(
        before: &Application,
        after: &Application,
        payload: &ForwardPayload,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id: after.id.clone(),
            application_number: after.application_number.clone(),
            transition: Transition::Forward,
            from: before.status,
            to: after.status,
            at,
            departments: payload
                .departments
                .iter()
                .map(|target| target.department_name.clone())
                .collect(),
            districts: payload
                .districts
                .iter()
                .map(|target| target.district_name.clone())
                .collect(),
            remarks: None,
        }
    }

    pub(crate) fn rejected(before: &Application, after: &Application, at: DateTime<Utc>) -> Self {
        Self {
            application_id: after.id.clone(),
            application_number: after.application_number.clone(),
            transition: Transition::Reject,
            from: before.status,
            to: after.status,
            at,
            departments: Vec::new(),
            districts: Vec::new(),
            remarks: after.remarks.clone(),
        }
    }

    /// Number of parties the backend fans the application out to.
    pub fn recipient_count(&self) -> usize {
        self.departments.len() + self.districts.len()
    }
}
