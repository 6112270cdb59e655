//! Equipment reconciliation against the persisted store
//!
//! A run has three steps:
//! 1. snapshot the project's stored equipment (fatal if the store is unreachable)
//! 2. plan a decision per draft and the store commands they need
//! 3. execute the commands in submission order, then recount the project's
//!    equipment from the store and write the aggregate

pub mod decision;
pub mod executor;
pub mod planner;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;

pub use decision::{Command, DraftDecision, ReconciliationDecision, ReconciliationPlan, SkipReason};
pub use executor::{CreatedEquipment, ExecutionReport, ItemFailure, execute_plan};
pub use planner::plan_reconciliation;

use crate::equipment::EquipmentDraft;
use crate::store::{EquipmentStore, ProjectAggregate, StoreError};

/// Default number of failures named in the summary line
pub const DEFAULT_FAILURE_PREVIEW: usize = 5;

/// Run options
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Caller-owned abort signal, checked between store commands
    pub abort: Option<Arc<AtomicBool>>,
}

/// The run could not start
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// The project's equipment could not be queried
    Connectivity(StoreError),
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::Connectivity(err) => {
                write!(f, "Could not load project equipment, nothing was saved: {}", err)
            }
        }
    }
}

impl std::error::Error for ReconcileError {}

/// Result of a reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub decisions: Vec<DraftDecision>,
    /// Commands the store accepted
    pub applied_count: usize,
    /// Drafts decided as skip
    pub skipped_count: usize,
    pub created: Vec<CreatedEquipment>,
    pub failures: Vec<ItemFailure>,
    /// Count written to the project, taken from the store after the run
    pub equipment_count: Option<usize>,
    pub aborted: bool,
}

impl ReconcileOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// First `limit` failures as `label: message`, joined with `; `
    pub fn failure_summary(&self, limit: usize) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }

        let mut summary = self
            .failures
            .iter()
            .take(limit)
            .map(ItemFailure::short)
            .collect::<Vec<_>>()
            .join("; ");

        if self.failures.len() > limit {
            summary.push_str(&format!(" (and {} more)", self.failures.len() - limit));
        }
        Some(summary)
    }
}

/// Reconcile a submitted draft set with the project's stored equipment
pub async fn reconcile(
    store: &dyn EquipmentStore,
    project_id: &str,
    drafts: &[EquipmentDraft],
    is_edit: bool,
    options: &ReconcileOptions,
) -> Result<ReconcileOutcome, ReconcileError> {
    let stored = if is_edit {
        store.query_by_project(project_id).await.map_err(|err| {
            log::error!("Failed to load equipment for project {}: {}", project_id, err);
            ReconcileError::Connectivity(err)
        })?
    } else {
        Vec::new()
    };

    let plan = plan_reconciliation(drafts, project_id, is_edit, &stored);
    let report = execute_plan(store, &plan.commands, options.abort.as_deref()).await;

    let mut failures = report.failures;
    let equipment_count = recount(store, project_id, &mut failures).await;

    Ok(ReconcileOutcome {
        skipped_count: plan.skip_count(),
        decisions: plan.decisions,
        applied_count: report.applied_count,
        created: report.created,
        failures,
        equipment_count,
        aborted: report.aborted,
    })
}

/// Recount the project's equipment from the store and write the aggregate
async fn recount(
    store: &dyn EquipmentStore,
    project_id: &str,
    failures: &mut Vec<ItemFailure>,
) -> Option<usize> {
    let count = match store.query_by_project(project_id).await {
        Ok(rows) => rows.len(),
        Err(err) => {
            log::warn!("Could not recount equipment for project {}: {}", project_id, err);
            failures.push(ItemFailure {
                index: None,
                label: "equipment count".to_string(),
                message: err.to_string(),
            });
            return None;
        }
    };

    log::info!("Project {} has {} equipment row(s)", project_id, count);
    let aggregate = ProjectAggregate {
        equipment_count: count,
    };
    if let Err(err) = store.update_project_aggregate(project_id, aggregate).await {
        log::warn!("Could not update equipment count for project {}: {}", project_id, err);
        failures.push(ItemFailure {
            index: None,
            label: "equipment count".to_string(),
            message: err.to_string(),
        });
    }

    Some(count)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::equipment::{EquipmentFields, Provenance};
    use crate::store::MemoryStore;

    fn fields(tag: &str, job: &str, title: &str) -> EquipmentFields {
        EquipmentFields {
            equipment_type: "Reactor".into(),
            tag_number: tag.into(),
            job_number: job.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    fn draft(tag: &str, job: &str, title: &str) -> EquipmentDraft {
        EquipmentDraft {
            fields: fields(tag, job, title),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_project_creates_and_counts() {
        let store = MemoryStore::new();
        let drafts = vec![
            draft("TAG-001", "JOB-1", "Unit A").with_id("Reactor-1"),
            draft("TAG-001", "JOB-1", "Unit A").with_id("Reactor-2"),
            draft("", "", "").with_id("Reactor-3"),
        ];

        let outcome = reconcile(&store, "p1", &drafts, false, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.applied_count, 1);
        assert_eq!(outcome.skipped_count, 2);
        assert_eq!(outcome.equipment_count, Some(1));
        assert_eq!(store.aggregate("p1").unwrap().equipment_count, 1);
        assert!(outcome.failure_summary(5).is_none());
    }

    #[tokio::test]
    async fn test_placeholder_matching_renamed_row_keeps_count() {
        let store = MemoryStore::new();
        let id_a = store.seed("p1", fields("TAG-A", "JOB-1", "Unit A"));
        store.seed("p1", fields("TAG-B", "JOB-1", "Unit B"));
        store.seed("p1", fields("TAG-C", "JOB-1", "Unit C"));

        let drafts = vec![
            EquipmentDraft::persisted(&id_a, fields("TAG-A-NEW", "JOB-1", "Unit A")),
            draft("TAG-A", "JOB-1", "Unit A").with_provenance(Provenance::NewTyped),
        ];

        let outcome = reconcile(&store, "p1", &drafts, true, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.decisions[1].decision,
            ReconciliationDecision::Skip(SkipReason::DuplicateNaturalKey)
        );
        assert_eq!(outcome.equipment_count, Some(3));
        assert_eq!(store.records().len(), 3);
        assert!(
            store
                .records()
                .iter()
                .any(|r| r.id == id_a && r.fields.tag_number == "TAG-A-NEW")
        );
    }

    #[tokio::test]
    async fn test_count_comes_from_store_not_drafts() {
        let store = MemoryStore::new();
        store.seed("p1", fields("OLD-1", "JOB-1", "Existing"));
        store.seed("p2", fields("OTHER", "JOB-9", "Elsewhere"));

        let drafts = vec![draft("NEW-1", "JOB-1", "Fresh")];
        let outcome = reconcile(&store, "p1", &drafts, true, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.equipment_count, Some(2));
        assert_eq!(store.aggregate("p1").unwrap().equipment_count, 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_fatal_in_edit_mode() {
        let store = MemoryStore::new();
        store.fail_queries_after(0);

        let err = reconcile(
            &store,
            "p1",
            &[draft("T-1", "J-1", "X")],
            true,
            &ReconcileOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ReconcileError::Connectivity(_)));
        assert!(store.records().is_empty());
        assert_eq!(store.calls(), vec!["query:p1"]);
    }

    #[tokio::test]
    async fn test_item_failures_are_summarised() {
        let store = MemoryStore::new();
        let drafts: Vec<EquipmentDraft> = (1..=7)
            .map(|n| draft(&format!("T-{}", n), "J-1", "Unit"))
            .collect();
        for n in 1..=6 {
            store.reject_tag(format!("T-{}", n));
        }

        let outcome = reconcile(&store, "p1", &drafts, false, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.applied_count, 1);
        assert_eq!(outcome.failures.len(), 6);
        assert_eq!(outcome.equipment_count, Some(1));

        let summary = outcome.failure_summary(5).unwrap();
        assert!(summary.starts_with("T-1: Tag T-1 rejected by store; T-2:"));
        assert!(summary.ends_with(" (and 1 more)"));
        assert!(!summary.contains("Check for conflicts"));
    }

    #[tokio::test]
    async fn test_other_projects_equipment_is_never_updated() {
        let store = MemoryStore::new();
        let foreign = store.seed("p2", fields("T-9", "J-1", "Pump"));

        let drafts = vec![EquipmentDraft::persisted(&foreign, fields("HIJACKED", "J-1", "Pump"))];
        let outcome = reconcile(&store, "p1", &drafts, true, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.decisions[0].decision, ReconciliationDecision::Create);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.equipment_count, Some(1));

        let p2_row = store.records().into_iter().find(|r| r.id == foreign).unwrap();
        assert_eq!(p2_row.project_id, "p2");
        assert_eq!(p2_row.fields.tag_number, "T-9");
    }

    #[tokio::test]
    async fn test_same_tag_in_one_run_is_stored_once() {
        let store = MemoryStore::new();
        let drafts = vec![draft("T-9", "J-1", "Pump"), draft("T-9", "J-2", "Pump spare")];

        let outcome = reconcile(&store, "p1", &drafts, true, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.decisions[1].decision,
            ReconciliationDecision::Skip(SkipReason::DuplicateNaturalKey)
        );
        let tagged = store
            .records()
            .iter()
            .filter(|r| r.fields.tag_number == "T-9")
            .count();
        assert_eq!(tagged, 1);
    }

    #[tokio::test]
    async fn test_duplicate_template_rows_create_once() {
        use crate::cell::{CellValue, RawRow};
        use crate::import::{EQUIPMENT_SCHEMA, import_equipment};

        let row = |sr: i64| -> RawRow {
            let mut cells = vec![CellValue::from(sr)];
            cells.extend(
                ["Reactor", "TAG-001", "JOB-1", "Unit A", "", "", ""]
                    .iter()
                    .map(|c| CellValue::from(*c)),
            );
            cells
        };
        let header: RawRow = EQUIPMENT_SCHEMA
            .headers()
            .into_iter()
            .map(CellValue::from)
            .collect();
        let rows = vec![header, row(1), row(2)];

        let import = import_equipment(&rows).unwrap();
        assert_eq!(import.drafts.len(), 2);

        let store = MemoryStore::new();
        let outcome = reconcile(&store, "p1", &import.drafts, false, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.decisions[0].decision, ReconciliationDecision::Create);
        assert_eq!(
            outcome.decisions[1].decision,
            ReconciliationDecision::Skip(SkipReason::DuplicateNaturalKey)
        );
        assert_eq!(outcome.applied_count, 1);
        assert_eq!(outcome.equipment_count, Some(1));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_recount_is_reported_not_fatal() {
        let store = MemoryStore::new();
        store.fail_queries_after(1);
        let id = store.seed("p1", fields("T-1", "J-1", "X"));

        let drafts = vec![EquipmentDraft::persisted(&id, fields("T-1", "J-1", "Y"))];
        let outcome = reconcile(&store, "p1", &drafts, true, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.applied_count, 1);
        assert_eq!(outcome.equipment_count, None);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].index.is_none());
    }

    #[tokio::test]
    async fn test_abort_before_execution() {
        let store = MemoryStore::new();
        let abort = Arc::new(AtomicBool::new(false));
        abort.store(true, Ordering::SeqCst);
        let options = ReconcileOptions {
            abort: Some(abort.clone()),
        };

        let outcome = reconcile(&store, "p1", &[draft("T-1", "J-1", "X")], false, &options)
            .await
            .unwrap();

        assert!(outcome.aborted);
        assert_eq!(outcome.applied_count, 0);
        assert_eq!(outcome.equipment_count, Some(0));
    }
}
