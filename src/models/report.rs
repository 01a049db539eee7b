//! Save-pipeline progress and per-animal outcomes.

use serde::Serialize;

use crate::builders::UnresolvedCode;
use crate::gateway::RecordId;

/// Lifecycle of one submission through the save pipeline.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing persisted yet.
    Idle,
    /// Raw submission archived.
    SubmissionSaved,
    /// Farmer record created.
    FarmerSaved,
    /// Animal loop finished (individual entries may have failed).
    AnimalsSaved,
    /// Pipeline completed.
    Done,
    /// Pipeline halted; absorbing.
    Failed,
}

impl PipelineStage {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        matches!(
            (self, next),
            (PipelineStage::Idle, PipelineStage::SubmissionSaved)
                | (PipelineStage::SubmissionSaved, PipelineStage::FarmerSaved)
                | (PipelineStage::FarmerSaved, PipelineStage::AnimalsSaved)
                | (PipelineStage::AnimalsSaved, PipelineStage::Done)
                | (
                    PipelineStage::Idle
                        | PipelineStage::SubmissionSaved
                        | PipelineStage::FarmerSaved
                        | PipelineStage::AnimalsSaved,
                    PipelineStage::Failed
                )
        )
    }
}

/// What happened to one animal entry and its nested records.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AnimalOutcome {
    /// Ear tag, or 1-based position when untagged.
    pub label: String,
    /// Created animal record.
    pub animal_id: Option<RecordId>,
    /// Created vaccination records.
    pub vaccination_ids: Vec<RecordId>,
    /// Created deworming records.
    pub deworming_ids: Vec<RecordId>,
    /// Errors raised while saving this entry.
    pub errors: Vec<String>,
}

/// Accumulated result of one pipeline run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SaveReport {
    /// Current stage.
    pub stage: PipelineStage,
    /// Archived submission record.
    pub submission_id: Option<RecordId>,
    /// Created farmer record.
    pub farmer_id: Option<RecordId>,
    /// One outcome per animal entry, in submission order.
    pub animals: Vec<AnimalOutcome>,
    /// Supplied codes that matched no reference record.
    pub unresolved: Vec<UnresolvedCode>,
}

impl Default for SaveReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveReport {
    /// Fresh report in [`PipelineStage::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
            submission_id: None,
            farmer_id: None,
            animals: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Move to `next` if the transition is permitted; returns whether it was.
    pub fn advance(&mut self, next: PipelineStage) -> bool {
        if self.stage.can_transition_to(next) {
            self.stage = next;
            true
        } else {
            false
        }
    }

    /// Number of animal entries that recorded at least one error.
    #[must_use]
    pub fn failed_entries(&self) -> usize {
        self.animals.iter().filter(|a| !a.errors.is_empty()).count()
    }
}
