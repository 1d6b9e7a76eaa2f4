//! Pure derivation of stage states from a job snapshot.

use std::collections::BTreeMap;

use super::PipelineStage;
use crate::core::{AnalysisResult, JobStatus, StageState};

/// Display state of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageView {
    /// The stage.
    pub stage: PipelineStage,
    /// Its derived state.
    pub state: StageState,
    /// Its output text, when received.
    pub output: Option<String>,
}

/// Display state of the whole pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineView {
    /// One entry per stage, in pipeline order.
    pub stages: [StageView; PipelineStage::COUNT],
    /// Overall progress, 0.0 to 100.0.
    pub progress_percent: f64,
}

impl PipelineView {
    /// The stage currently running, if any.
    #[must_use]
    pub fn active_stage(&self) -> Option<PipelineStage> {
        self.stages
            .iter()
            .find(|view| view.state == StageState::Active)
            .map(|view| view.stage)
    }

    /// Number of stages in the given state.
    #[must_use]
    pub fn count(&self, state: StageState) -> usize {
        self.stages.iter().filter(|view| view.state == state).count()
    }
}

fn has_output(outputs: Option<&BTreeMap<String, String>>, key: &str) -> bool {
    outputs
        .and_then(|outputs| outputs.get(key))
        .is_some_and(|text| !text.is_empty())
}

/// Number of stage outputs received so far.
///
/// Only the four stage keys count; anything else the service adds to
/// `agent_outputs` is ignored.
#[must_use]
pub fn outputs_received(outputs: Option<&BTreeMap<String, String>>) -> usize {
    outputs.map_or(0, |outputs| {
        outputs
            .keys()
            .filter(|key| PipelineStage::from_key(key).is_some())
            .count()
    })
}

/// State of the stage at `index` for a job in `status`.
#[must_use]
pub fn stage_state(
    index: usize,
    status: JobStatus,
    outputs: Option<&BTreeMap<String, String>>,
) -> StageState {
    let Some(stage) = PipelineStage::ALL.get(index) else {
        return StageState::Waiting;
    };
    let present = has_output(outputs, stage.key());

    if present || status == JobStatus::Completed {
        return StageState::Completed;
    }
    if status == JobStatus::Failed {
        return StageState::Failed;
    }
    if status == JobStatus::Processing && outputs_received(outputs) == index {
        return StageState::Active;
    }
    StageState::Waiting
}

/// Overall progress in percent.
#[must_use]
pub fn progress_percent(status: JobStatus, outputs: Option<&BTreeMap<String, String>>) -> f64 {
    match status {
        JobStatus::Completed => 100.0,
        JobStatus::Failed => 0.0,
        _ => {
            let received = outputs_received(outputs).min(PipelineStage::COUNT);
            #[allow(clippy::cast_precision_loss)]
            let fraction = received as f64 / PipelineStage::COUNT as f64;
            fraction * 100.0
        }
    }
}

/// Derives every stage state and the progress from `(status, result)`.
#[must_use]
pub fn derive_pipeline(status: JobStatus, result: Option<&AnalysisResult>) -> PipelineView {
    let outputs = result.map(|r| &r.agent_outputs);
    let stages = PipelineStage::ALL.map(|stage| StageView {
        stage,
        state: stage_state(stage.index(), status, outputs),
        output: result
            .and_then(|r| r.output_for(stage.key()))
            .map(str::to_string),
    });

    PipelineView {
        stages,
        progress_percent: progress_percent(status, outputs),
    }
}
