//! Pure reconciliation planning
//!
//! Planning never talks to the store: it works from a snapshot of the
//! project's stored equipment taken before anything is written. This keeps
//! rescue matching stable when an update in the same run renames a row.

use std::collections::{HashMap, HashSet};

use super::decision::{Command, DraftDecision, ReconciliationDecision, ReconciliationPlan, SkipReason};
use crate::equipment::identity::{MIN_PERSISTED_ID_LEN, classify};
use crate::equipment::{EquipmentDraft, Identifier, NaturalKey, Provenance};
use crate::store::{EquipmentRecord, NewEquipment};

/// Plan one reconciliation run
///
/// Outside an edit context every draft with some real key field becomes a
/// create. In an edit context drafts whose store id belongs to `stored` become
/// updates; the rest are matched by natural key against `stored` and against
/// creates planned earlier in the run before falling back to create.
pub fn plan_reconciliation(
    drafts: &[EquipmentDraft],
    project_id: &str,
    is_edit: bool,
    stored: &[EquipmentRecord],
) -> ReconciliationPlan {
    let decisions = if is_edit {
        plan_edit(drafts, stored)
    } else {
        plan_new(drafts)
    };

    let mut plan = ReconciliationPlan::default();
    for (index, (draft, decision)) in drafts.iter().zip(decisions).enumerate() {
        let label = draft.label();
        let fields = draft.fields.with_sentinels();

        match &decision {
            ReconciliationDecision::Create => plan.commands.push(Command::Create {
                index,
                label: label.clone(),
                payload: NewEquipment::pending(project_id, fields),
            }),
            ReconciliationDecision::Update(id) => plan.commands.push(Command::Update {
                index,
                label: label.clone(),
                project_id: project_id.to_string(),
                id: id.clone(),
                fields,
            }),
            ReconciliationDecision::Skip(reason) => {
                log::warn!("Skipping equipment '{}': {}", label, reason);
            }
        }

        plan.decisions.push(DraftDecision {
            index,
            label,
            decision,
        });
    }

    log::info!(
        "Planned {} create(s), {} update(s), {} skip(s)",
        plan.create_count(),
        plan.update_count(),
        plan.skip_count()
    );
    plan
}

/// Collapse key for creates: sentinel-filled, so blank and `TBD` collide
fn create_key(draft: &EquipmentDraft) -> (String, String, String) {
    draft.fields.with_sentinels().natural_key().dedup_key()
}

fn plan_new(drafts: &[EquipmentDraft]) -> Vec<ReconciliationDecision> {
    let mut seen = HashSet::new();

    drafts
        .iter()
        .map(|draft| {
            if draft.natural_key().is_vacant() {
                ReconciliationDecision::Skip(SkipReason::Incomplete)
            } else if !seen.insert(create_key(draft)) {
                ReconciliationDecision::Skip(SkipReason::DuplicateNaturalKey)
            } else {
                ReconciliationDecision::Create
            }
        })
        .collect()
}

fn plan_edit(drafts: &[EquipmentDraft], stored: &[EquipmentRecord]) -> Vec<ReconciliationDecision> {
    let stored_ids: HashSet<&str> = stored.iter().map(|r| r.id.as_str()).collect();
    let stored_keys: Vec<(&str, NaturalKey)> = stored
        .iter()
        .map(|r| (r.id.as_str(), r.fields.natural_key()))
        .collect();

    let identifiers: Vec<Identifier> = drafts
        .iter()
        .map(|draft| {
            let identifier = classify(draft);
            warn_if_downgraded(draft, &identifier);
            match identifier {
                Identifier::Persisted(id) if !stored_ids.contains(id.as_str()) => {
                    log::warn!(
                        "Equipment id {} is not part of this project; matching '{}' by tag/job/title",
                        id,
                        draft.label()
                    );
                    Identifier::Placeholder
                }
                other => other,
            }
        })
        .collect();

    let mut decisions: HashMap<usize, ReconciliationDecision> = HashMap::new();
    let mut claimed: HashSet<String> = HashSet::new();

    // Drafts carrying a store id
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for (index, identifier) in identifiers.iter().enumerate() {
        let Identifier::Persisted(id) = identifier else {
            continue;
        };

        let decision = if !seen_ids.insert(id.as_str()) {
            SkipReason::DuplicateId.into()
        } else {
            claimed.insert(id.clone());
            ReconciliationDecision::Update(id.clone())
        };
        decisions.insert(index, decision);
    }

    // Drafts without a usable id
    let mut seen_keys: HashSet<(String, String, String)> = HashSet::new();
    let mut planned_creates: Vec<NaturalKey> = Vec::new();
    for (index, identifier) in identifiers.iter().enumerate() {
        if identifier.is_persisted() {
            continue;
        }

        let key = drafts[index].natural_key();
        let decision = if !key.is_complete() {
            SkipReason::Incomplete.into()
        } else if !seen_keys.insert(key.dedup_key()) {
            SkipReason::DuplicateNaturalKey.into()
        } else {
            match stored_keys.iter().find(|(_, stored)| key.matches_stored(stored)) {
                Some((id, _)) if claimed.contains(*id) => SkipReason::DuplicateNaturalKey.into(),
                Some((id, _)) => {
                    log::debug!("Matched '{}' to stored equipment {}", key, id);
                    claimed.insert(id.to_string());
                    ReconciliationDecision::Update(id.to_string())
                }
                // Rows created earlier in this run count as stored
                None if planned_creates.iter().any(|created| key.matches_stored(created)) => {
                    SkipReason::DuplicateNaturalKey.into()
                }
                None => {
                    planned_creates.push(key);
                    ReconciliationDecision::Create
                }
            }
        };
        decisions.insert(index, decision);
    }

    (0..drafts.len())
        .map(|index| {
            decisions
                .remove(&index)
                .unwrap_or(ReconciliationDecision::Skip(SkipReason::Incomplete))
        })
        .collect()
}

fn warn_if_downgraded(draft: &EquipmentDraft, identifier: &Identifier) {
    let id = draft.id.trim();
    let client_side = matches!(
        draft.provenance,
        Some(Provenance::NewTyped) | Some(Provenance::BulkImported)
    );
    if identifier.is_persisted() || id.is_empty() || client_side {
        return;
    }
    if id.chars().count() >= MIN_PERSISTED_ID_LEN {
        log::warn!(
            "Treating id '{}' of {} as client-side; it will be matched by tag/job/title",
            id,
            draft.equipment_type()
        );
    } else {
        log::debug!("Id '{}' is a client placeholder", id);
    }
}
