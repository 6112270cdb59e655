//! Equipment form state
//!
//! Every transition borrows the current state and returns a new one, so a
//! caller can keep earlier states around for undo.

use serde::Serialize;

use crate::equipment::{EquipmentDraft, EquipmentFields, Provenance};
use crate::store::EquipmentRecord;

/// Draft being edited, detached from the collection until committed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditBuffer {
    pub index: usize,
    pub fields: EquipmentFields,
}

/// Invalid form transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    IndexOutOfRange(usize),
    NoActiveEdit,
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::IndexOutOfRange(index) => write!(f, "No equipment at position {}", index),
            FormError::NoActiveEdit => write!(f, "No equipment is being edited"),
        }
    }
}

impl std::error::Error for FormError {}

/// All client-held equipment of one project form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormState {
    drafts: Vec<EquipmentDraft>,
    editing: Option<EditBuffer>,
    is_edit: bool,
}

impl FormState {
    /// Empty form for a new project
    pub fn new_project() -> Self {
        Self::default()
    }

    /// Edit form seeded from a project's stored equipment
    pub fn loaded_from_store(records: &[EquipmentRecord]) -> Self {
        FormState {
            drafts: records
                .iter()
                .map(|r| EquipmentDraft::persisted(&r.id, r.fields.clone()))
                .collect(),
            editing: None,
            is_edit: true,
        }
    }

    pub fn drafts(&self) -> &[EquipmentDraft] {
        &self.drafts
    }

    pub fn editing(&self) -> Option<&EditBuffer> {
        self.editing.as_ref()
    }

    pub fn is_edit(&self) -> bool {
        self.is_edit
    }

    /// Draft count per type, in first-seen order
    pub fn quantities(&self) -> Vec<(String, usize)> {
        let mut quantities: Vec<(String, usize)> = Vec::new();
        for draft in &self.drafts {
            match quantities.iter_mut().find(|(t, _)| t == draft.equipment_type()) {
                Some((_, n)) => *n += 1,
                None => quantities.push((draft.equipment_type().to_string(), 1)),
            }
        }
        quantities
    }

    pub fn add_draft(&self, draft: EquipmentDraft) -> Self {
        let mut next = self.clone();
        next.drafts.push(draft);
        next
    }

    pub fn remove_draft(&self, index: usize) -> Result<Self, FormError> {
        if index >= self.drafts.len() {
            return Err(FormError::IndexOutOfRange(index));
        }

        let mut next = self.clone();
        next.drafts.remove(index);
        next.editing = match self.editing.clone() {
            Some(buffer) if buffer.index == index => None,
            Some(mut buffer) if buffer.index > index => {
                buffer.index -= 1;
                Some(buffer)
            }
            other => other,
        };
        Ok(next)
    }

    pub fn start_edit(&self, index: usize) -> Result<Self, FormError> {
        let draft = self
            .drafts
            .get(index)
            .ok_or(FormError::IndexOutOfRange(index))?;

        let mut next = self.clone();
        next.editing = Some(EditBuffer {
            index,
            fields: draft.fields.clone(),
        });
        Ok(next)
    }

    /// Change the edit buffer without touching the collection
    pub fn update_edit(&self, update: impl FnOnce(&mut EquipmentFields)) -> Result<Self, FormError> {
        let mut next = self.clone();
        let buffer = next.editing.as_mut().ok_or(FormError::NoActiveEdit)?;
        update(&mut buffer.fields);
        Ok(next)
    }

    /// Write the edit buffer back; the draft keeps its id and provenance
    pub fn commit_edit(&self) -> Result<Self, FormError> {
        let buffer = self.editing.clone().ok_or(FormError::NoActiveEdit)?;

        let mut next = self.clone();
        let draft = next
            .drafts
            .get_mut(buffer.index)
            .ok_or(FormError::IndexOutOfRange(buffer.index))?;
        draft.fields = buffer.fields;
        next.editing = None;
        Ok(next)
    }

    pub fn cancel_edit(&self) -> Self {
        let mut next = self.clone();
        next.editing = None;
        next
    }

    /// Quantity stepper for one equipment type
    ///
    /// In a new project the type's drafts are renumbered `<type>-1..N`, keeping
    /// typed values of the drafts that remain. In an edit form, growing appends
    /// blank drafts without an id and shrinking drops the type's last drafts.
    /// Quantity 0 removes the type.
    pub fn set_quantity(&self, equipment_type: &str, quantity: usize) -> Self {
        let mut next = self.clone();
        next.editing = None;

        let positions: Vec<usize> = self
            .drafts
            .iter()
            .enumerate()
            .filter(|(_, d)| d.equipment_type() == equipment_type)
            .map(|(i, _)| i)
            .collect();

        if quantity < positions.len() {
            for &index in positions[quantity..].iter().rev() {
                next.drafts.remove(index);
            }
        } else {
            for _ in positions.len()..quantity {
                let draft = if self.is_edit {
                    EquipmentDraft::new(equipment_type).with_provenance(Provenance::NewTyped)
                } else {
                    EquipmentDraft::new(equipment_type)
                };
                next.drafts.push(draft);
            }
        }

        if !self.is_edit {
            let mut n = 0;
            for draft in next
                .drafts
                .iter_mut()
                .filter(|d| d.equipment_type() == equipment_type)
            {
                n += 1;
                let documents = std::mem::take(&mut draft.documents);
                let fields = std::mem::take(&mut draft.fields);
                *draft = EquipmentDraft::placeholder(equipment_type, n);
                draft.fields = fields;
                draft.documents = documents;
            }
        }

        next
    }

    /// Append drafts produced by a bulk import
    pub fn merge_imported(&self, drafts: Vec<EquipmentDraft>) -> Self {
        let mut next = self.clone();
        next.drafts.extend(drafts);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::STATUS_PENDING;

    fn record(id: &str, tag: &str) -> EquipmentRecord {
        EquipmentRecord {
            id: id.into(),
            project_id: "p1".into(),
            fields: EquipmentFields {
                equipment_type: "Reactor".into(),
                tag_number: tag.into(),
                ..Default::default()
            },
            status: STATUS_PENDING.into(),
            progress: 0,
            progress_phase: "documentation".into(),
        }
    }

    #[test]
    fn test_create_mode_stepper_numbers_placeholders() {
        let state = FormState::new_project().set_quantity("Reactor", 3);
        let ids: Vec<&str> = state.drafts().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["Reactor-1", "Reactor-2", "Reactor-3"]);
        assert!(
            state
                .drafts()
                .iter()
                .all(|d| d.provenance == Some(Provenance::NewTyped))
        );

        let state = state
            .start_edit(1)
            .unwrap()
            .update_edit(|f| f.tag_number = "R-2".into())
            .unwrap()
            .commit_edit()
            .unwrap()
            .set_quantity("Reactor", 2);
        assert_eq!(state.drafts().len(), 2);
        assert_eq!(state.drafts()[1].id, "Reactor-2");
        assert_eq!(state.drafts()[1].fields.tag_number, "R-2");

        let state = state.set_quantity("Reactor", 0);
        assert!(state.drafts().is_empty());
    }

    #[test]
    fn test_edit_mode_stepper_appends_blank_ids_and_truncates() {
        let state = FormState::loaded_from_store(&[record("store-id-1", "R-1")]);
        assert!(state.is_edit());

        let grown = state.set_quantity("Reactor", 3);
        assert_eq!(grown.drafts().len(), 3);
        assert_eq!(grown.drafts()[0].id, "store-id-1");
        assert_eq!(grown.drafts()[1].id, "");
        assert_eq!(grown.drafts()[2].provenance, Some(Provenance::NewTyped));

        let shrunk = grown.set_quantity("Reactor", 1);
        assert_eq!(shrunk.drafts(), state.drafts());
    }

    #[test]
    fn test_edit_buffer_lifecycle() {
        let state = FormState::new_project().add_draft(EquipmentDraft::new("Reactor"));
        assert_eq!(state.update_edit(|_| {}), Err(FormError::NoActiveEdit));

        let editing = state
            .start_edit(0)
            .unwrap()
            .update_edit(|f| f.title = "Main".into())
            .unwrap();
        assert_eq!(editing.drafts()[0].fields.title, "");

        let cancelled = editing.cancel_edit();
        assert_eq!(cancelled.drafts()[0].fields.title, "");
        assert!(cancelled.editing().is_none());

        let committed = editing.commit_edit().unwrap();
        assert_eq!(committed.drafts()[0].fields.title, "Main");
        assert_eq!(state.start_edit(5), Err(FormError::IndexOutOfRange(5)));
    }

    #[test]
    fn test_remove_shifts_edit_buffer() {
        let state = FormState::new_project()
            .add_draft(EquipmentDraft::new("Reactor").with_tag("A"))
            .add_draft(EquipmentDraft::new("Reactor").with_tag("B"))
            .start_edit(1)
            .unwrap();

        let removed = state.remove_draft(0).unwrap();
        assert_eq!(removed.editing().unwrap().index, 0);
        assert_eq!(removed.drafts()[0].fields.tag_number, "B");

        let removed = state.remove_draft(1).unwrap();
        assert!(removed.editing().is_none());
    }

    #[test]
    fn test_merge_imported_and_quantities() {
        let imported = vec![
            EquipmentDraft::new("Storage Tank").with_provenance(Provenance::BulkImported),
            EquipmentDraft::new("Reactor").with_provenance(Provenance::BulkImported),
        ];
        let state = FormState::new_project()
            .set_quantity("Reactor", 1)
            .merge_imported(imported);

        assert_eq!(
            state.quantities(),
            vec![("Reactor".to_string(), 2), ("Storage Tank".to_string(), 1)]
        );
    }
}
