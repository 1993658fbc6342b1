use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier assigned by the backend when the filmmaker submits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Review status of a NOC application. The backend owns the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApplicationStatus {
    Submitted,
    Forwarded,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Submitted,
            Self::Forwarded,
            Self::Approved,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Forwarded => "Forwarded",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Submitted and Forwarded applications still await a decision.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Submitted | Self::Forwarded)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Read-only projection of the submitting filmmaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filmmaker {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// A NOC application as held in the console's cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(alias = "_id")]
    pub id: ApplicationId,
    pub application_number: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub filmmaker: Filmmaker,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Application {
    /// Apply a backend-confirmed status while keeping the immutable identity fields.
    pub(crate) fn confirm(&mut self, confirmed: Option<Application>, fallback: ApplicationStatus) {
        match confirmed {
            Some(remote) if remote.id == self.id => {
                self.status = remote.status;
                if remote.remarks.is_some() {
                    self.remarks = remote.remarks;
                }
                if !remote.filmmaker.name.is_empty() || !remote.filmmaker.email.is_empty() {
                    self.filmmaker = remote.filmmaker;
                }
            }
            _ => self.status = fallback,
        }
    }
}
