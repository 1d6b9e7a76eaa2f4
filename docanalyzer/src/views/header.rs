//! Title bar and upload drawer.

use crate::core::HealthState;
use crate::upload::UploadForm;

/// Product title.
pub const TITLE: &str = "FDA  FINANCIAL DOCUMENT ANALYZER";
/// Drawer hint while collapsed.
pub const NEW_ANALYSIS: &str = "NEW ANALYSIS";
/// Prompt shown in the drawer before a file is chosen.
pub const DROP_HINT: &str = "Drop financial PDF or click to browse";

/// Renders the title bar with the health indicator.
#[must_use]
pub fn render_header(health: HealthState) -> String {
    format!("{TITLE}    API STATUS: {health}")
}

/// Label of the submit control.
#[must_use]
pub const fn submit_label(submitting: bool) -> &'static str {
    if submitting {
        "ANALYZING"
    } else {
        "ANALYZE DOCUMENT"
    }
}

/// Renders the upload drawer.
#[must_use]
pub fn render_upload(form: &UploadForm) -> String {
    if !form.is_open() {
        return format!("+ {NEW_ANALYSIS}");
    }

    let file = form.file().map_or_else(
        || DROP_HINT.to_string(),
        |file| format!("{} ({} KB)", file.name, file.size().div_ceil(1024)),
    );
    let mut lines = vec![
        format!("- {NEW_ANALYSIS}"),
        format!("File:  {file}"),
        format!("Query: {}", form.query()),
        format!("Mode:  {}", form.mode()),
    ];
    if let Some(error) = form.error() {
        lines.push(format!("! {error}"));
    }
    let disabled = if form.can_submit() { "" } else { " (disabled)" };
    lines.push(format!("[ {} ]{disabled}", submit_label(form.is_submitting())));
    lines.join("\n")
}
