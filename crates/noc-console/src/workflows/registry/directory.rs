use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::domain::VerifiableEntity;
use crate::workflows::noc::feed::{matches_query, normalize_query, Searchable};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

impl VerificationFilter {
    pub fn matches(self, verified: bool) -> bool {
        match self {
            Self::All => true,
            Self::Verified => verified,
            Self::Unverified => !verified,
        }
    }
}

impl FromStr for VerificationFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "verified" => Ok(Self::Verified),
            "unverified" | "pending" => Ok(Self::Unverified),
            other => Err(format!("unknown verification filter '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for VerificationFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Directory filter for artist and vendor listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub verification: VerificationFilter,
}

impl Searchable for VerifiableEntity {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.id.0.as_str()]
    }
}

/// Order-preserving projection of a registry listing.
pub fn filter_entities<'a>(
    entities: &'a [VerifiableEntity],
    filter: &EntityFilter,
) -> Vec<&'a VerifiableEntity> {
    let needle = normalize_query(filter.query.as_deref());
    entities
        .iter()
        .filter(|entity| filter.verification.matches(entity.is_verified()))
        .filter(|entity| matches_query(*entity, needle.as_deref()))
        .collect()
}
