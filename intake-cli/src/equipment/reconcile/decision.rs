//! Per-draft reconciliation decisions and the commands they produce

use serde::Serialize;

use crate::equipment::EquipmentFields;
use crate::store::NewEquipment;

/// Why a draft was left out of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Another draft already carries the same store id
    DuplicateId,
    /// Tag, job and title are missing or placeholders
    Incomplete,
    /// Another draft (or an update) already covers the same tag/job/title
    DuplicateNaturalKey,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DuplicateId => write!(f, "duplicate identifier"),
            SkipReason::Incomplete => write!(f, "incomplete: tag, job and title are required"),
            SkipReason::DuplicateNaturalKey => write!(f, "duplicate tag/job/title"),
        }
    }
}

/// Outcome planned for one draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "detail", rename_all = "snake_case")]
pub enum ReconciliationDecision {
    /// Overwrite the stored row with this id
    Update(String),
    /// Insert a new row
    Create,
    /// Leave the draft out
    Skip(SkipReason),
}

impl ReconciliationDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, ReconciliationDecision::Skip(_))
    }
}

impl From<SkipReason> for ReconciliationDecision {
    fn from(reason: SkipReason) -> Self {
        ReconciliationDecision::Skip(reason)
    }
}

impl std::fmt::Display for ReconciliationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationDecision::Update(id) => write!(f, "update {}", id),
            ReconciliationDecision::Create => write!(f, "create"),
            ReconciliationDecision::Skip(reason) => write!(f, "skip ({})", reason),
        }
    }
}

/// Decision for one submitted draft, in submission order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftDecision {
    /// Position of the draft in the submission
    pub index: usize,
    /// Tag, or type when the tag is blank
    pub label: String,
    pub decision: ReconciliationDecision,
}

/// Store call produced by a non-skip decision
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        index: usize,
        label: String,
        payload: NewEquipment,
    },
    Update {
        index: usize,
        label: String,
        project_id: String,
        id: String,
        fields: EquipmentFields,
    },
}

impl Command {
    pub fn index(&self) -> usize {
        match self {
            Command::Create { index, .. } | Command::Update { index, .. } => *index,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Command::Create { label, .. } | Command::Update { label, .. } => label,
        }
    }
}

/// Decisions plus the ordered commands that carry them out
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    pub decisions: Vec<DraftDecision>,
    pub commands: Vec<Command>,
}

impl ReconciliationPlan {
    pub fn create_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.decision == ReconciliationDecision::Create)
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.decision, ReconciliationDecision::Update(_)))
            .count()
    }

    pub fn skip_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.decision.is_skip()).count()
    }

    /// Count of skips for one reason
    pub fn skip_count_for(&self, reason: SkipReason) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.decision == ReconciliationDecision::Skip(reason))
            .count()
    }
}
