//! Persisted equipment store
//!
//! The reconciler talks to the store only through [`EquipmentStore`]. Every
//! method reports a [`StoreError`] whose kind tells the caller whether the store
//! is unreachable or a single operation was rejected.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::equipment::EquipmentFields;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Status given to newly created equipment
pub const STATUS_PENDING: &str = "pending";

/// Progress phase given to newly created equipment
pub const PHASE_DOCUMENTATION: &str = "documentation";

/// Equipment row as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub fields: EquipmentFields,
    pub status: String,
    pub progress: i64,
    pub progress_phase: String,
}

/// Payload for creating an equipment row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEquipment {
    pub project_id: String,
    #[serde(flatten)]
    pub fields: EquipmentFields,
    pub status: String,
    pub progress: i64,
    pub progress_phase: String,
}

impl NewEquipment {
    /// Pending equipment at zero progress in the documentation phase
    pub fn pending(project_id: impl Into<String>, fields: EquipmentFields) -> Self {
        NewEquipment {
            project_id: project_id.into(),
            fields,
            status: STATUS_PENDING.to_string(),
            progress: 0,
            progress_phase: PHASE_DOCUMENTATION.to_string(),
        }
    }
}

/// Project-level values derived from its equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectAggregate {
    pub equipment_count: usize,
}

/// Store failure
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached at all
    Connectivity(String),
    /// A single operation was rejected
    Operation(String),
    /// The addressed row does not exist
    NotFound(String),
}

impl StoreError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connectivity(msg) => write!(f, "Store unreachable: {}", msg),
            StoreError::Operation(msg) => write!(f, "{}", msg),
            StoreError::NotFound(id) => write!(f, "Record not found: {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

/// Backing store for project equipment
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    /// All equipment rows of a project
    async fn query_by_project(&self, project_id: &str) -> Result<Vec<EquipmentRecord>, StoreError>;

    /// Insert a row and return its store-native id
    async fn create(&self, equipment: &NewEquipment) -> Result<String, StoreError>;

    /// Overwrite the descriptive fields of a row belonging to `project_id`
    async fn update(
        &self,
        project_id: &str,
        id: &str,
        fields: &EquipmentFields,
    ) -> Result<(), StoreError>;

    /// Write project-level aggregates
    async fn update_project_aggregate(
        &self,
        project_id: &str,
        aggregate: ProjectAggregate,
    ) -> Result<(), StoreError>;
}
