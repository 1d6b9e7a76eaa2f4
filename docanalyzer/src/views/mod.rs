//! Plain-text rendering of dashboard state.
//!
//! Every function here is pure: it takes state snapshots (and the current
//! time where ages are shown) and returns text.

mod format;
mod header;
mod job_detail;
mod job_list;

pub use format::{format_duration, format_time_ago, parse_timestamp, truncate};
pub use header::{render_header, render_upload, submit_label, DROP_HINT, NEW_ANALYSIS, TITLE};
pub use job_detail::{
    progress_bar, render_job_detail, AWAITING_OUTPUT, LOADING_JOB, SELECT_PROMPT, UNKNOWN_FAILURE,
};
pub use job_list::{render_job_list, JOB_LIST_TITLE, LOADING_JOBS, NO_JOBS};
