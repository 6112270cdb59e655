//! Identifier classification for equipment drafts
//!
//! A draft's id is either a store-native identifier or something the client
//! made up. Store ids are long opaque strings, client placeholders look like
//! `Reactor-3`. Provenance arrives with the submitted drafts, so it can only
//! demote an id: a draft marked as persisted still has to pass the shape check.

use once_cell::sync::Lazy;
use regex::Regex;

use super::draft::{EquipmentDraft, Provenance};

/// Shortest id accepted as store-native
pub const MIN_PERSISTED_ID_LEN: usize = 20;

static PLACEHOLDER_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^-]+-\d+$").unwrap());

/// Classified draft identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Identifier known to the store
    Persisted(String),
    /// Client-side identifier (or none at all)
    Placeholder,
}

impl Identifier {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Identifier::Persisted(_))
    }

    pub fn persisted_id(&self) -> Option<&str> {
        match self {
            Identifier::Persisted(id) => Some(id),
            Identifier::Placeholder => None,
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Persisted(id) => write!(f, "persisted({})", id),
            Identifier::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Classify an id by its shape alone
pub fn classify_by_shape(id: &str, equipment_type: &str) -> Identifier {
    let id = id.trim();
    let equipment_type = equipment_type.trim();

    if id.chars().count() < MIN_PERSISTED_ID_LEN {
        return Identifier::Placeholder;
    }
    if !equipment_type.is_empty() && id.contains(equipment_type) {
        return Identifier::Placeholder;
    }
    if PLACEHOLDER_SHAPE.is_match(id) {
        return Identifier::Placeholder;
    }

    Identifier::Persisted(id.to_string())
}

/// Classify a draft's identifier
pub fn classify(draft: &EquipmentDraft) -> Identifier {
    match draft.provenance {
        Some(Provenance::NewTyped) | Some(Provenance::BulkImported) => Identifier::Placeholder,
        Some(Provenance::Persisted) | None => classify_by_shape(&draft.id, draft.equipment_type()),
    }
}
