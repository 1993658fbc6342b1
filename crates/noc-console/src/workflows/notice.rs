//! Single-slot operator notification.
//!
//! The console shows at most one alert at a time. It opens, then either closes
//! on its own after a delay or waits for the operator to confirm or dismiss it.
//! A confirmation carries a [`ConsoleCommand`] instead of a callback, so the
//! caller decides what to run and the workflow stays testable without a UI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::noc::{ApplicationId, RecipientKind, WorkflowError};
use super::registry::{EntityId, EntityKind, RegistryError};

const SUCCESS_AUTO_CLOSE: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
    Confirm,
}

/// Deferred workflow action queued behind a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ConsoleCommand {
    ForwardApplication {
        application_id: ApplicationId,
        #[serde(default)]
        departments: Vec<u32>,
        #[serde(default)]
        districts: Vec<u32>,
    },
    RejectApplication {
        application_id: ApplicationId,
        remarks: String,
    },
    SetVerified {
        kind: EntityKind,
        entity_id: EntityId,
        verified: bool,
    },
    DeleteEntities {
        kind: EntityKind,
        ids: Vec<EntityId>,
    },
}

impl ConsoleCommand {
    /// Recipient ids of a forward command paired with their catalog.
    pub fn recipients(&self) -> Vec<(RecipientKind, u32)> {
        match self {
            Self::ForwardApplication {
                departments,
                districts,
                ..
            } => departments
                .iter()
                .map(|id| (RecipientKind::Department, *id))
                .chain(districts.iter().map(|id| (RecipientKind::District, *id)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Notice {
    #[default]
    Closed,
    Open {
        level: NoticeLevel,
        title: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        auto_close_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        on_confirm: Option<ConsoleCommand>,
    },
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
            auto_close_ms: Some(SUCCESS_AUTO_CLOSE.as_millis() as u64),
            on_confirm: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            level: NoticeLevel::Warning,
            title: title.into(),
            message: message.into(),
            auto_close_ms: None,
            on_confirm: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
            auto_close_ms: None,
            on_confirm: None,
        }
    }

    /// Ask the operator before running `command`.
    pub fn confirm(
        title: impl Into<String>,
        message: impl Into<String>,
        command: ConsoleCommand,
    ) -> Self {
        Self::Open {
            level: NoticeLevel::Confirm,
            title: title.into(),
            message: message.into(),
            auto_close_ms: None,
            on_confirm: Some(command),
        }
    }

    pub fn from_workflow_error(error: &WorkflowError, generic: &str) -> Self {
        match error {
            WorkflowError::Validation(_) => {
                Self::warning("Check the form", error.operator_message(generic))
            }
            WorkflowError::Backend(_) => Self::error("Error", error.operator_message(generic)),
        }
    }

    pub fn from_registry_error(error: &RegistryError, generic: &str) -> Self {
        match error {
            RegistryError::PartialFailure(_) => {
                Self::warning("Partially completed", error.operator_message(generic))
            }
            RegistryError::UnknownEntity { .. } | RegistryError::NothingSelected { .. } => {
                Self::warning("Check the selection", error.operator_message(generic))
            }
            RegistryError::Backend(_) => Self::error("Error", error.operator_message(generic)),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn level(&self) -> Option<NoticeLevel> {
        match self {
            Self::Open { level, .. } => Some(*level),
            Self::Closed => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Open { message, .. } => Some(message),
            Self::Closed => None,
        }
    }

    /// Close and hand back the queued command, if any.
    pub fn accept(&mut self) -> Option<ConsoleCommand> {
        match std::mem::take(self) {
            Self::Open { on_confirm, .. } => on_confirm,
            Self::Closed => None,
        }
    }

    /// Close without running anything.
    pub fn dismiss(&mut self) {
        *self = Self::Closed;
    }

    /// Advance the auto-close timer; confirmations and errors never auto-close.
    pub fn elapse(&mut self, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let expired = match self {
            Self::Open {
                auto_close_ms: Some(remaining),
                ..
            } if elapsed_ms >= *remaining => true,
            Self::Open {
                auto_close_ms: Some(remaining),
                ..
            } => {
                *remaining -= elapsed_ms;
                false
            }
            _ => false,
        };

        if expired {
            *self = Self::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::noc::{BackendError, ValidationError};

    fn delete_command() -> ConsoleCommand {
        ConsoleCommand::DeleteEntities {
            kind: EntityKind::Vendor,
            ids: vec![EntityId::from("v1"), EntityId::from("v2")],
        }
    }

    #[test]
    fn accepting_a_confirmation_yields_its_command_once() {
        let mut notice = Notice::confirm("Delete vendors", "Delete 2 vendors?", delete_command());

        assert_eq!(notice.accept(), Some(delete_command()));
        assert_eq!(notice, Notice::Closed);
        assert_eq!(notice.accept(), None);
    }

    #[test]
    fn dismiss_drops_the_command() {
        let mut notice = Notice::confirm("Delete vendors", "Delete 2 vendors?", delete_command());
        notice.dismiss();
        assert!(!notice.is_open());
        assert_eq!(notice.accept(), None);
    }

    #[test]
    fn success_notices_close_after_their_delay() {
        let mut notice = Notice::success("Forwarded", "Application forwarded");
        notice.elapse(Duration::from_millis(1_500));
        assert!(notice.is_open());
        notice.elapse(Duration::from_millis(500));
        assert!(!notice.is_open());
    }

    #[test]
    fn confirmations_ignore_the_timer() {
        let mut notice = Notice::confirm("Delete vendors", "Delete 2 vendors?", delete_command());
        notice.elapse(Duration::from_secs(3_600));
        assert_eq!(notice.level(), Some(NoticeLevel::Confirm));
    }

    #[test]
    fn validation_and_backend_errors_map_to_distinct_levels() {
        let validation = WorkflowError::Validation(ValidationError::EmptyRemarks);
        let backend = WorkflowError::Backend(BackendError::Transport("refused".to_string()));

        let warning = Notice::from_workflow_error(&validation, "Failed.");
        let error = Notice::from_workflow_error(&backend, "Failed.");

        assert_eq!(warning.level(), Some(NoticeLevel::Warning));
        assert_eq!(warning.message(), Some("remarks are required to reject an application"));
        assert_eq!(error.level(), Some(NoticeLevel::Error));
    }

    #[test]
    fn commands_round_trip_as_tagged_json() {
        let command: ConsoleCommand = serde_json::from_value(serde_json::json!({
            "command": "forward_application",
            "application_id": "a1",
            "departments": [101],
            "districts": [20]
        }))
        .expect("command parses");

        assert_eq!(
            command.recipients(),
            vec![(RecipientKind::Department, 101), (RecipientKind::District, 20)]
        );
    }
}
