//! Equipment drafts, identity classification and store reconciliation

pub mod draft;
pub mod identity;
pub mod reconcile;

pub use draft::{EquipmentDraft, EquipmentFields, NaturalKey, Provenance, SENTINEL, is_real};
pub use identity::{Identifier, classify, classify_by_shape};
pub use reconcile::{
    ReconcileError, ReconcileOptions, ReconcileOutcome, ReconciliationDecision, SkipReason,
    reconcile,
};
