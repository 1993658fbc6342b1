use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::{Recipient, RecipientCatalog, RecipientKind};
use super::validation::ValidationError;

/// Deduplicated, insertion-ordered set of forwarding targets for one forwarding action.
#[derive(Debug, Clone)]
pub struct RecipientSet {
    catalog: Arc<RecipientCatalog>,
    entries: Vec<Recipient>,
}

impl RecipientSet {
    pub fn new(catalog: Arc<RecipientCatalog>) -> Self {
        Self {
            catalog,
            entries: Vec::new(),
        }
    }

    /// Add a candidate picked by the operator.
    ///
    /// The stored entry is the catalog's own copy, so the payload reflects the
    /// catalog at add time regardless of what the caller does with `candidate`.
    pub fn add(&mut self, candidate: &Recipient) -> Result<(), ValidationError> {
        self.add_by_id(candidate.kind, candidate.id)
    }

    pub fn add_by_id(&mut self, kind: RecipientKind, id: u32) -> Result<(), ValidationError> {
        let entry = self
            .catalog
            .lookup(kind, id)
            .ok_or_else(|| ValidationError::UnknownRecipient {
                kind,
                id,
                catalog_version: self.catalog.version().to_string(),
            })?;

        if !self.contains(kind, id) {
            self.entries.push(entry.clone());
        }
        Ok(())
    }

    pub fn remove(&mut self, id: u32, kind: RecipientKind) {
        self.entries
            .retain(|entry| !(entry.kind == kind && entry.id == id));
    }

    pub fn contains(&self, kind: RecipientKind, id: u32) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.kind == kind && entry.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipient> {
        self.entries.iter()
    }

    pub fn catalog(&self) -> &Arc<RecipientCatalog> {
        &self.catalog
    }

    pub fn to_payload(&self) -> ForwardPayload {
        let mut payload = ForwardPayload::default();
        for entry in &self.entries {
            match entry.kind {
                RecipientKind::Department => payload.departments.push(DepartmentTarget {
                    department_id: entry.id,
                    department_name: entry.name.clone(),
                }),
                RecipientKind::District => payload.districts.push(DistrictTarget {
                    district_id: entry.id,
                    district_name: entry.name.clone(),
                }),
            }
        }
        payload
    }
}

/// Request body of the forwarding call; the backend fans out to every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardPayload {
    pub districts: Vec<DistrictTarget>,
    pub departments: Vec<DepartmentTarget>,
}

impl ForwardPayload {
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty() && self.departments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTarget {
    pub department_id: u32,
    pub department_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictTarget {
    pub district_id: u32,
    pub district_name: String,
}
