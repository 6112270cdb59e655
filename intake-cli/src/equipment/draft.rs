//! Client-held equipment drafts

use serde::{Deserialize, Serialize};

/// Placeholder written into blank mandatory fields on create
pub const SENTINEL: &str = "TBD";

/// True when a field carries a real value (not blank, not the sentinel)
pub fn is_real(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != SENTINEL
}

/// Where a draft came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Loaded from the store; the id is store-native
    Persisted,
    /// Added by hand or by the quantity stepper
    NewTyped,
    /// Produced by a bulk import
    BulkImported,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Persisted => write!(f, "persisted"),
            Provenance::NewTyped => write!(f, "new"),
            Provenance::BulkImported => write!(f, "bulk-imported"),
        }
    }
}

/// Descriptive equipment fields, shared by drafts and stored records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentFields {
    #[serde(rename = "type")]
    pub equipment_type: String,
    #[serde(default)]
    pub tag_number: String,
    #[serde(default)]
    pub job_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub design_code: String,
}

impl EquipmentFields {
    /// Copy with blank tag/job/title replaced by the sentinel
    pub fn with_sentinels(&self) -> Self {
        let fill = |value: &str| {
            let value = value.trim();
            if value.is_empty() {
                SENTINEL.to_string()
            } else {
                value.to_string()
            }
        };
        EquipmentFields {
            equipment_type: self.equipment_type.trim().to_string(),
            tag_number: fill(&self.tag_number),
            job_number: fill(&self.job_number),
            title: fill(&self.title),
            size: self.size.trim().to_string(),
            material: self.material.trim().to_string(),
            design_code: self.design_code.trim().to_string(),
        }
    }

    /// Business key of these fields
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            equipment_type: self.equipment_type.trim().to_string(),
            tag_number: self.tag_number.trim().to_string(),
            job_number: self.job_number.trim().to_string(),
            title: self.title.trim().to_string(),
        }
    }
}

/// Business identity used when no reliable identifier exists
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NaturalKey {
    pub equipment_type: String,
    pub tag_number: String,
    pub job_number: String,
    pub title: String,
}

impl NaturalKey {
    /// Key used to collapse duplicate drafts within one submission
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.tag_number.clone(),
            self.job_number.clone(),
            self.title.clone(),
        )
    }

    /// True when tag, job and title are all blank or the sentinel
    pub fn is_vacant(&self) -> bool {
        !is_real(&self.tag_number) && !is_real(&self.job_number) && !is_real(&self.title)
    }

    /// True when tag, job and title all carry real values
    pub fn is_complete(&self) -> bool {
        is_real(&self.tag_number) && is_real(&self.job_number) && is_real(&self.title)
    }

    /// Match against a stored record's key
    ///
    /// A real tag decides alone; without one, job and title must both be real
    /// and equal.
    pub fn matches_stored(&self, stored: &NaturalKey) -> bool {
        if is_real(&self.tag_number) {
            return self.tag_number == stored.tag_number;
        }
        is_real(&self.job_number)
            && is_real(&self.title)
            && self.job_number == stored.job_number
            && self.title == stored.title
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.equipment_type, self.tag_number, self.job_number, self.title
        )
    }
}

/// One equipment row as held by the client before submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDraft {
    /// Store id, client placeholder, or empty
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub fields: EquipmentFields,
    /// Attached document references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<String>,
    /// Explicit origin; when absent the id's shape is used instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl EquipmentDraft {
    /// Blank draft of a type
    pub fn new(equipment_type: impl Into<String>) -> Self {
        EquipmentDraft {
            fields: EquipmentFields {
                equipment_type: equipment_type.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Freshly typed draft with the client placeholder id `<type>-<n>`
    pub fn placeholder(equipment_type: &str, n: usize) -> Self {
        EquipmentDraft::new(equipment_type)
            .with_id(format!("{}-{}", equipment_type, n))
            .with_provenance(Provenance::NewTyped)
    }

    /// Draft built from a stored record
    pub fn persisted(id: impl Into<String>, fields: EquipmentFields) -> Self {
        EquipmentDraft {
            id: id.into(),
            fields,
            documents: Vec::new(),
            provenance: Some(Provenance::Persisted),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.fields.tag_number = tag.into();
        self
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.fields.job_number = job.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.fields.title = title.into();
        self
    }

    pub fn equipment_type(&self) -> &str {
        &self.fields.equipment_type
    }

    pub fn natural_key(&self) -> NaturalKey {
        self.fields.natural_key()
    }

    /// Label used in user-facing messages: the tag, else the type
    pub fn label(&self) -> String {
        let tag = self.fields.tag_number.trim();
        if is_real(tag) {
            tag.to_string()
        } else {
            self.fields.equipment_type.trim().to_string()
        }
    }
}
