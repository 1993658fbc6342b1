use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::workflows::noc::backend::BackendError;

/// Registries that share the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Artist,
    Vendor,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Vendor => "vendor",
        }
    }

    /// Collection segment used in backend routes.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Artist => "artists",
            Self::Vendor => "vendors",
        }
    }

    /// Value of the `role` field in the user directory.
    pub const fn role(self) -> &'static str {
        self.label()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "artist" | "artists" => Ok(Self::Artist),
            "vendor" | "vendors" => Ok(Self::Vendor),
            other => Err(format!("unknown registry '{other}'")),
        }
    }
}

/// Backend identifier; the directory returns both numeric and string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl EntityId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) if !raw.trim().is_empty() => Some(Self(raw.trim().to_string())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("entity id must be a string or number"))
    }
}

/// Backend fields that may carry the verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlagField {
    IsVerified,
    Verified,
    Status,
}

impl FlagField {
    const ALL: [Self; 3] = [Self::IsVerified, Self::Verified, Self::Status];

    pub const fn key(self) -> &'static str {
        match self {
            Self::IsVerified => "isVerified",
            Self::Verified => "verified",
            Self::Status => "status",
        }
    }

    /// Wire value counts as verified. `status` is a numeric code; only `1` means verified.
    fn truthy(self, value: &Value) -> Option<bool> {
        match (self, value) {
            (Self::IsVerified | Self::Verified, Value::Bool(flag)) => Some(*flag),
            (_, Value::Number(number)) => Some(number.as_i64() == Some(1)),
            _ => None,
        }
    }

    /// Re-encode `verified` in the JSON type the backend originally used.
    fn encode(self, original: &Value, verified: bool) -> Value {
        match original {
            Value::Number(_) => Value::from(u8::from(verified)),
            _ => Value::Bool(verified),
        }
    }
}

/// Normalized verification state plus the wire fields it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationFlag {
    verified: bool,
    #[serde(skip)]
    fields: Vec<(FlagField, Value)>,
}

impl VerificationFlag {
    /// Read the flag from a backend record. Any truthy field means verified.
    pub fn read(record: &Map<String, Value>) -> Self {
        let mut verified = false;
        let mut fields = Vec::new();

        for field in FlagField::ALL {
            if let Some(value) = record.get(field.key()) {
                if let Some(flag) = field.truthy(value) {
                    verified |= flag;
                    fields.push((field, value.clone()));
                }
            }
        }

        Self { verified, fields }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Fields the flag was read from, in their original wire encoding.
    pub fn representation(&self) -> Vec<FlagField> {
        self.fields.iter().map(|(field, _)| *field).collect()
    }

    /// The same representation carrying a new value.
    pub fn with_value(&self, verified: bool) -> Self {
        let fields = if self.fields.is_empty() {
            vec![(FlagField::IsVerified, Value::Bool(verified))]
        } else {
            self.fields
                .iter()
                .map(|(field, original)| (*field, field.encode(original, verified)))
                .collect()
        };

        Self { verified, fields }
    }

    fn write_into(&self, record: &mut Map<String, Value>) {
        for (field, value) in &self.fields {
            record.insert(field.key().to_string(), value.clone());
        }
    }

    fn erase_from(&self, record: &mut Map<String, Value>) {
        for (field, _) in &self.fields {
            record.remove(field.key());
        }
    }
}

/// An artist or vendor record held in the registry cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiableEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "verified", serialize_with = "serialize_flag")]
    verification: VerificationFlag,
    #[serde(rename = "record")]
    raw: Map<String, Value>,
}

fn serialize_flag<S>(flag: &VerificationFlag, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bool(flag.is_verified())
}

const NAME_KEYS: [&str; 4] = ["name", "fullName", "businessName", "companyName"];

impl VerifiableEntity {
    /// Build from a directory record, keeping the record for lossless echo.
    pub fn from_wire(kind: EntityKind, value: Value) -> Result<Self, BackendError> {
        let Value::Object(raw) = value else {
            return Err(BackendError::Malformed(format!(
                "{kind} record is not a JSON object"
            )));
        };

        let id = ["_id", "id"]
            .iter()
            .find_map(|key| raw.get(*key).and_then(EntityId::from_value))
            .ok_or_else(|| BackendError::Malformed(format!("{kind} record without an id")))?;

        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let name = NAME_KEYS
            .iter()
            .find_map(|key| text(*key))
            .or_else(|| {
                let first = text("firstName").unwrap_or_default();
                let last = text("lastName").unwrap_or_default();
                let joined = format!("{first} {last}").trim().to_string();
                (!joined.is_empty()).then_some(joined)
            })
            .unwrap_or_default();
        let email = text("email").unwrap_or_default();
        let created_at = text("createdAt").and_then(|stamp| stamp.parse().ok());

        let verification = VerificationFlag::read(&raw);

        Ok(Self {
            id,
            kind,
            name,
            email,
            created_at,
            verification,
            raw,
        })
    }

    pub fn is_verified(&self) -> bool {
        self.verification.is_verified()
    }

    pub fn verification(&self) -> &VerificationFlag {
        &self.verification
    }

    /// Replace the flag and keep the raw record in step with it.
    pub(crate) fn set_verification(&mut self, flag: VerificationFlag) {
        self.verification.erase_from(&mut self.raw);
        flag.write_into(&mut self.raw);
        self.verification = flag;
    }

    /// The record as the backend sent it, with the current verification fields.
    pub fn to_wire(&self) -> Value {
        Value::Object(self.raw.clone())
    }
}
