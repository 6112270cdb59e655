//! Sequential execution of planned store commands

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::decision::Command;
use crate::store::EquipmentStore;

/// A command the store rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    /// Draft position, or None for project-level steps
    pub index: Option<usize>,
    /// Tag, type, or the project step that failed
    pub label: String,
    pub message: String,
}

impl ItemFailure {
    /// `label: first sentence of the message`
    pub fn short(&self) -> String {
        let first = self
            .message
            .split(". ")
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('.');
        format!("{}: {}", self.label, first)
    }
}

/// A row written by a create command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEquipment {
    pub index: usize,
    pub label: String,
    pub id: String,
}

/// What happened when the commands ran
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub applied_count: usize,
    pub created: Vec<CreatedEquipment>,
    pub failures: Vec<ItemFailure>,
    /// Commands not attempted because the run was aborted
    pub not_run: usize,
    pub aborted: bool,
}

/// Run commands one at a time, in order
///
/// A failing command is recorded and the run moves on. The abort flag is
/// checked before each command; once set, the remaining commands are left
/// unexecuted.
pub async fn execute_plan(
    store: &dyn EquipmentStore,
    commands: &[Command],
    abort: Option<&AtomicBool>,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    for (position, command) in commands.iter().enumerate() {
        if abort.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            report.aborted = true;
            report.not_run = commands.len() - position;
            log::warn!("Reconciliation aborted; {} command(s) not run", report.not_run);
            break;
        }

        let result = match command {
            Command::Create {
                index,
                label,
                payload,
            } => store.create(payload).await.map(|id| {
                log::debug!("Created equipment '{}' as {}", label, id);
                report.created.push(CreatedEquipment {
                    index: *index,
                    label: label.clone(),
                    id,
                });
            }),
            Command::Update {
                project_id,
                id,
                fields,
                label,
                ..
            } => store.update(project_id, id, fields).await.map(|()| {
                log::debug!("Updated equipment '{}' ({})", label, id);
            }),
        };

        match result {
            Ok(()) => report.applied_count += 1,
            Err(err) => {
                log::warn!("Failed to save equipment '{}': {}", command.label(), err);
                report.failures.push(ItemFailure {
                    index: Some(command.index()),
                    label: command.label().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::EquipmentFields;
    use crate::store::{MemoryStore, NewEquipment};

    fn create(index: usize, tag: &str) -> Command {
        Command::Create {
            index,
            label: tag.to_string(),
            payload: NewEquipment::pending(
                "p1",
                EquipmentFields {
                    equipment_type: "Reactor".into(),
                    tag_number: tag.into(),
                    ..Default::default()
                },
            ),
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let store = MemoryStore::new();
        store.reject_tag("T-2");
        let commands = vec![create(0, "T-1"), create(1, "T-2"), create(2, "T-3")];

        let report = execute_plan(&store, &commands, None).await;

        assert_eq!(report.applied_count, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, Some(1));
        assert_eq!(report.failures[0].label, "T-2");
        assert_eq!(report.created.len(), 2);
        assert_eq!(
            store.calls(),
            vec!["create:T-1", "create:T-2", "create:T-3"]
        );
    }

    #[tokio::test]
    async fn test_abort_flag_stops_between_items() {
        let store = MemoryStore::new();
        let abort = AtomicBool::new(true);
        let commands = vec![create(0, "T-1"), create(1, "T-2")];

        let report = execute_plan(&store, &commands, Some(&abort)).await;

        assert!(report.aborted);
        assert_eq!(report.not_run, 2);
        assert_eq!(report.applied_count, 0);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_item_failure() {
        let store = MemoryStore::new();
        let commands = vec![Command::Update {
            index: 0,
            label: "T-1".into(),
            project_id: "p1".into(),
            id: "gone".into(),
            fields: EquipmentFields::default(),
        }];

        let report = execute_plan(&store, &commands, None).await;
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("gone"));
    }

    #[test]
    fn test_failure_short_form_keeps_first_sentence() {
        let failure = ItemFailure {
            index: Some(0),
            label: "TAG-9".into(),
            message: "Tag TAG-9 rejected by store. Check for conflicts".into(),
        };
        assert_eq!(failure.short(), "TAG-9: Tag TAG-9 rejected by store");
    }
}
