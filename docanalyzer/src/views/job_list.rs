//! The "RECENT ANALYSES" roster.

use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use super::format::{format_time_ago, truncate};
use crate::core::Job;
use crate::polling::JobListState;

/// Section title.
pub const JOB_LIST_TITLE: &str = "RECENT ANALYSES";
/// Shown while the first fetch is pending.
pub const LOADING_JOBS: &str = "Loading analyses...";
/// Shown when the service has no jobs.
pub const NO_JOBS: &str = "No analyses yet";

const QUERY_WIDTH: usize = 35;
const FILENAME_WIDTH: usize = 20;

fn job_row(job: &Job, selected: Option<&str>, now: DateTime<Utc>) -> [String; 6] {
    let marker = if selected == Some(job.job_id.as_str()) { ">" } else { "" };
    let created = job
        .created_at
        .as_deref()
        .map_or_else(String::new, |created| format_time_ago(created, now));
    let duration = job
        .duration_seconds
        .filter(|secs| *secs > 0.0)
        .map_or_else(String::new, |secs| format!("{secs:.1}s"));
    [
        marker.to_string(),
        job.status.badge_label().to_string(),
        truncate(job.query_text(), QUERY_WIDTH),
        truncate(job.filename(), FILENAME_WIDTH),
        created,
        duration,
    ]
}

/// Renders the roster, marking the selected job.
#[must_use]
pub fn render_job_list(state: &JobListState, selected: Option<&str>, now: DateTime<Utc>) -> String {
    let mut out = vec![JOB_LIST_TITLE.to_string()];
    if let Some(error) = &state.error {
        out.push(format!("! {error}"));
    }

    if state.jobs.is_empty() {
        out.push(if state.loading { LOADING_JOBS } else { NO_JOBS }.to_string());
        return out.join("\n");
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["", "Status", "Query", "File", "Created", "Duration"]);
    for job in &state.jobs {
        table.add_row(job_row(job, selected, now));
    }
    out.push(table.to_string());
    out.join("\n")
}
