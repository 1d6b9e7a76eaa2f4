//! Fixture builders.

use crate::api::{DocumentFile, PDF_CONTENT_TYPE};
use crate::core::{AnalysisResult, Job, JobPage};
use crate::stages::PipelineStage;

/// A small in-memory PDF.
#[must_use]
pub fn sample_pdf(name: &str) -> DocumentFile {
    DocumentFile::new(name, PDF_CONTENT_TYPE, b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec())
}

/// A result holding the outputs of the first `stages` stages.
#[must_use]
pub fn processing_result(stages: usize) -> AnalysisResult {
    AnalysisResult::with_outputs(
        PipelineStage::ALL
            .iter()
            .take(stages)
            .map(|stage| (stage.key(), format!("{} report", stage.agent_name()))),
    )
}

/// A result holding all four outputs and a final analysis.
#[must_use]
pub fn completed_result(job_id: &str) -> AnalysisResult {
    AnalysisResult {
        job_id: Some(job_id.to_string()),
        analysis: Some("Overall: hold.".to_string()),
        ..processing_result(PipelineStage::COUNT)
    }
}

/// A roster page whose total equals its length.
#[must_use]
pub fn job_page(jobs: Vec<Job>) -> JobPage {
    JobPage {
        total: jobs.len() as u64,
        jobs,
    }
}
