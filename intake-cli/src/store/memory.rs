//! In-process equipment store
//!
//! Backs dry runs and tests. Faults can be injected to exercise the
//! reconciler's failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{EquipmentRecord, EquipmentStore, NewEquipment, ProjectAggregate, StoreError};
use crate::equipment::EquipmentFields;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<EquipmentRecord>,
    aggregates: HashMap<String, ProjectAggregate>,
    /// Operations (create/update/aggregate) that fail before any succeeds again
    fail_next_ops: usize,
    /// Every project query fails with a connectivity error
    queries_down: bool,
    /// Project queries allowed to succeed before `queries_down` takes effect
    queries_before_down: usize,
    /// Writes touching these tags are rejected
    rejected_tags: HashSet<String>,
    /// Operation log, in call order
    calls: Vec<String>,
}

/// Equipment store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending record directly and return its id
    pub fn seed(&self, project_id: &str, fields: EquipmentFields) -> String {
        let payload = NewEquipment::pending(project_id, fields);
        let id = Uuid::new_v4().to_string();
        if let Ok(mut inner) = self.inner.lock() {
            inner.records.push(record_from(&id, &payload));
        }
        id
    }

    /// Fail the next `n` write operations
    pub fn fail_next_ops(&self, n: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next_ops = n;
        }
    }

    /// Make project queries fail after `after` successful ones
    pub fn fail_queries_after(&self, after: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.queries_down = true;
            inner.queries_before_down = after;
        }
    }

    /// Reject every create or update carrying this tag
    pub fn reject_tag(&self, tag: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rejected_tags.insert(tag.into());
        }
    }

    /// Snapshot of every record
    pub fn records(&self) -> Vec<EquipmentRecord> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    /// Last aggregate written for a project
    pub fn aggregate(&self, project_id: &str) -> Option<ProjectAggregate> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.aggregates.get(project_id).copied())
    }

    /// Operation log (`query:<project>`, `create:<tag>`, `update:<id>`, `aggregate:<project>`)
    pub fn calls(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.calls.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Connectivity("memory store lock poisoned".to_string()))
    }
}

impl Inner {
    fn take_injected_failure(&mut self) -> bool {
        if self.fail_next_ops > 0 {
            self.fail_next_ops -= 1;
            true
        } else {
            false
        }
    }

    fn check_write(&mut self, tag: &str) -> Result<(), StoreError> {
        if self.take_injected_failure() {
            return Err(StoreError::Operation("Injected write failure. Try again".to_string()));
        }
        if self.rejected_tags.contains(tag.trim()) {
            return Err(StoreError::Operation(format!(
                "Tag {} rejected by store. Check for conflicts",
                tag.trim()
            )));
        }
        Ok(())
    }
}

fn record_from(id: &str, payload: &NewEquipment) -> EquipmentRecord {
    EquipmentRecord {
        id: id.to_string(),
        project_id: payload.project_id.clone(),
        fields: payload.fields.clone(),
        status: payload.status.clone(),
        progress: payload.progress,
        progress_phase: payload.progress_phase.clone(),
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn query_by_project(&self, project_id: &str) -> Result<Vec<EquipmentRecord>, StoreError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("query:{}", project_id));

        if inner.queries_down {
            if inner.queries_before_down == 0 {
                return Err(StoreError::Connectivity("query refused".to_string()));
            }
            inner.queries_before_down -= 1;
        }

        Ok(inner
            .records
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create(&self, equipment: &NewEquipment) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("create:{}", equipment.fields.tag_number));
        inner.check_write(&equipment.fields.tag_number)?;

        let id = Uuid::new_v4().to_string();
        inner.records.push(record_from(&id, equipment));
        Ok(id)
    }

    async fn update(
        &self,
        project_id: &str,
        id: &str,
        fields: &EquipmentFields,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("update:{}", id));
        inner.check_write(&fields.tag_number)?;

        let record = inner
            .records
            .iter_mut()
            .find(|r| r.id == id && r.project_id == project_id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.fields = fields.clone();
        Ok(())
    }

    async fn update_project_aggregate(
        &self,
        project_id: &str,
        aggregate: ProjectAggregate,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.calls.push(format!("aggregate:{}", project_id));
        if inner.take_injected_failure() {
            return Err(StoreError::Operation("Injected aggregate failure".to_string()));
        }
        inner.aggregates.insert(project_id.to_string(), aggregate);
        Ok(())
    }
}
