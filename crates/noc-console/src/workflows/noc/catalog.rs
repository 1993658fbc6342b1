use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which catalog a recipient was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Department,
    District,
}

impl RecipientKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::District => "district",
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecipientKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "department" | "departments" => Ok(Self::Department),
            "district" | "districts" => Ok(Self::District),
            other => Err(format!("unknown recipient kind '{other}'")),
        }
    }
}

/// A forwarding target as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: u32,
    pub name: String,
    pub kind: RecipientKind,
}

impl Recipient {
    pub fn department(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: RecipientKind::Department,
        }
    }

    pub fn district(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: RecipientKind::District,
        }
    }
}

/// Departments are presented to operators in groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentGroup {
    pub label: String,
    pub departments: Vec<Recipient>,
}

/// Fixed, versioned enumeration of valid forwarding targets.
///
/// The catalog is immutable once built and is handed to every
/// [`RecipientSet`](super::recipients::RecipientSet) so alternate
/// jurisdictions can be substituted without touching global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientCatalog {
    version: String,
    department_groups: Vec<DepartmentGroup>,
    districts: Vec<Recipient>,
}

impl RecipientCatalog {
    pub fn new(
        version: impl Into<String>,
        department_groups: Vec<DepartmentGroup>,
        districts: Vec<Recipient>,
    ) -> Self {
        Self {
            version: version.into(),
            department_groups,
            districts,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn department_groups(&self) -> &[DepartmentGroup] {
        &self.department_groups
    }

    pub fn departments(&self) -> impl Iterator<Item = &Recipient> {
        self.department_groups
            .iter()
            .flat_map(|group| group.departments.iter())
    }

    pub fn districts(&self) -> &[Recipient] {
        &self.districts
    }

    pub fn lookup(&self, kind: RecipientKind, id: u32) -> Option<&Recipient> {
        match kind {
            RecipientKind::Department => self.departments().find(|entry| entry.id == id),
            RecipientKind::District => self.districts.iter().find(|entry| entry.id == id),
        }
    }

    /// The catalog shipped with the console build.
    pub fn standard() -> Self {
        let group = |label: &str, entries: &[(u32, &str)]| DepartmentGroup {
            label: label.to_string(),
            departments: entries
                .iter()
                .map(|(id, name)| Recipient::department(*id, *name))
                .collect(),
        };

        let department_groups = vec![
            group(
                "State Secretariat",
                &[
                    (101, "Cabinet Secretariat"),
                    (102, "Information & Public Relations Department"),
                    (103, "Art, Culture & Youth Department"),
                ],
            ),
            group(
                "Law & Order",
                &[
                    (111, "Home Department"),
                    (112, "Office of the Director General of Police, Bihar"),
                    (113, "Transport Department"),
                ],
            ),
            group(
                "Heritage & Environment",
                &[
                    (121, "Environment, Forest & Climate Change Department"),
                    (122, "Directorate of Archaeology"),
                    (123, "Tourism Department"),
                ],
            ),
            group(
                "Infrastructure",
                &[
                    (131, "Road Construction Department"),
                    (132, "Urban Development & Housing Department"),
                    (133, "Building Construction Department"),
                ],
            ),
        ];

        let districts = [
            "Araria",
            "Arwal",
            "Aurangabad",
            "Banka",
            "Begusarai",
            "Bhagalpur",
            "Bhojpur",
            "Buxar",
            "Darbhanga",
            "East Champaran",
            "Gaya",
            "Gopalganj",
            "Jamui",
            "Jehanabad",
            "Kaimur",
            "Katihar",
            "Khagaria",
            "Kishanganj",
            "Lakhisarai",
            "Madhepura",
            "Madhubani",
            "Munger",
            "Muzaffarpur",
            "Nalanda",
            "Nawada",
            "Patna",
            "Purnia",
            "Rohtas",
            "Saharsa",
            "Samastipur",
            "Saran",
            "Sheikhpura",
            "Sheohar",
            "Sitamarhi",
            "Siwan",
            "Supaul",
            "Vaishali",
            "West Champaran",
        ]
        .iter()
        .zip(1u32..)
        .map(|(name, id)| Recipient::district(id, *name))
        .collect();

        Self::new("2024.1", department_groups, districts)
    }
}
