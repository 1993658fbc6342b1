use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::domain::{Application, ApplicationStatus, UnknownStatus};

/// Status facet of the activity feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Submitted or Forwarded.
    Pending,
    Exactly(ApplicationStatus),
}

impl StatusFilter {
    pub fn matches(self, status: ApplicationStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status.is_pending(),
            Self::Exactly(expected) => status == expected,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            _ => value.parse().map(Self::Exactly),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Pending => f.write_str("pending"),
            Self::Exactly(status) => write!(f, "{}", status.label().to_ascii_lowercase()),
        }
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Operator-supplied filter over the activity feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilter {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default, alias = "from")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, alias = "to")]
    pub date_to: Option<NaiveDate>,
}

impl FeedFilter {
    pub fn pending() -> Self {
        Self {
            status: StatusFilter::Pending,
            ..Self::default()
        }
    }
}

/// Records that can be matched by the free-text box.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Application {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.application_number.as_str(),
            self.filmmaker.name.as_str(),
            self.status.label(),
            self.filmmaker.email.as_str(),
        ]
    }
}

/// Lower-cased needle, or `None` when the query is blank.
pub(crate) fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring match against any searchable field.
pub(crate) fn matches_query<T: Searchable + ?Sized>(entry: &T, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => entry
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle)),
    }
}

/// Side-effect-free projection of applications through a [`FeedFilter`].
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    needle: Option<String>,
    status: StatusFilter,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl ActivityFeed {
    pub fn new(filter: &FeedFilter) -> Self {
        Self {
            needle: normalize_query(filter.query.as_deref()),
            status: filter.status,
            date_from: filter.date_from,
            date_to: filter.date_to,
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        if !self.status.matches(application.status) {
            return false;
        }

        // Whole calendar days: from start of `date_from` through end of `date_to`.
        let created_on = application.created_at.date_naive();
        if self.date_from.is_some_and(|from| created_on < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| created_on > to) {
            return false;
        }

        matches_query(application, self.needle.as_deref())
    }

    /// Order-preserving subsequence of `applications` that passes the filter.
    pub fn apply<'a>(&self, applications: &'a [Application]) -> Vec<&'a Application> {
        applications
            .iter()
            .filter(|application| self.matches(application))
            .collect()
    }
}
