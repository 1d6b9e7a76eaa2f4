//! Detail pane for the selected job.

use chrono::{DateTime, Utc};

use super::format::{format_duration, format_time_ago};
use crate::core::{Job, JobStatus};
use crate::polling::JobPollState;
use crate::stages::{derive_pipeline, PipelineView, StageView};

/// Shown when nothing is selected.
pub const SELECT_PROMPT: &str = "Select an analysis to view details";
/// Shown until the first snapshot of a selected job arrives.
pub const LOADING_JOB: &str = "Loading analysis...";
/// Shown for a stage without output.
pub const AWAITING_OUTPUT: &str = "Awaiting output...";
/// Shown for a failed job that carries no message.
pub const UNKNOWN_FAILURE: &str = "An unknown error occurred during processing.";

const PROGRESS_WIDTH: usize = 24;

/// A text progress bar followed by its percentage.
#[must_use]
pub fn progress_bar(percent: f64) -> String {
    let percent = percent.clamp(0.0, 100.0);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((percent / 100.0) * PROGRESS_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {percent:.0}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

fn meta_line(job: &Job, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();
    if !job.filename().is_empty() {
        parts.push(job.filename().to_string());
    }
    if let Some(created) = job.created_at.as_deref() {
        parts.push(format_time_ago(created, now));
    }
    if let Some(secs) = job.duration_seconds.filter(|secs| *secs > 0.0) {
        parts.push(format!("Duration: {}", format_duration(secs)));
    }
    parts.join(" · ")
}

fn stage_lines(view: &StageView) -> Vec<String> {
    let mut lines = vec![format!(
        "{} / {:<28} {}",
        view.stage.number(),
        view.stage.agent_name(),
        view.state.label()
    )];
    match &view.output {
        Some(output) => lines.extend(output.lines().map(|line| format!("     {line}"))),
        None => lines.push(format!("     {AWAITING_OUTPUT}")),
    }
    lines
}

fn pipeline_lines(pipeline: &PipelineView) -> Vec<String> {
    let mut lines = vec![progress_bar(pipeline.progress_percent), String::new()];
    for view in &pipeline.stages {
        lines.extend(stage_lines(view));
    }
    lines
}

/// Renders the detail pane.
#[must_use]
pub fn render_job_detail(state: &JobPollState, now: DateTime<Utc>) -> String {
    let Some(job_id) = state.job_id.as_deref() else {
        return SELECT_PROMPT.to_string();
    };
    let Some(job) = state.job.as_ref() else {
        let mut lines = vec![LOADING_JOB.to_string(), format!("JOB ID: {job_id}")];
        if let Some(error) = &state.error {
            lines.push(format!("! {error}"));
        }
        return lines.join("\n");
    };

    let mut lines = vec![
        format!("[{}]  JOB ID: {}", job.status.badge_label(), job.job_id),
        job.query_text().to_string(),
        meta_line(job, now),
        String::new(),
    ];
    lines.extend(pipeline_lines(&derive_pipeline(job.status, state.result.as_ref())));

    match job.status {
        JobStatus::Completed => {
            if let Some(result) = job.result.as_deref().filter(|r| !r.is_empty()) {
                lines.push(String::new());
                lines.push("── FINAL ANALYSIS ──".to_string());
                lines.extend(result.lines().map(str::to_string));
            }
        }
        JobStatus::Failed => {
            lines.push(String::new());
            lines.push("ERROR LOG".to_string());
            let message = job
                .error_message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(UNKNOWN_FAILURE);
            lines.push(message.to_string());
        }
        _ => {}
    }

    if let Some(error) = &state.error {
        lines.push(String::new());
        lines.push(format!("! {error}"));
    }
    lines.join("\n")
}
