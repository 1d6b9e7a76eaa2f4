//! Text formatting shared by the views.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses a service timestamp.
///
/// The service writes ISO-8601 and sometimes leaves out the offset; such
/// values are read as UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Coarse age of a timestamp relative to `now`.
///
/// Unparseable input is returned as is; future times read as "just now".
#[must_use]
pub fn format_time_ago(created_at: &str, now: DateTime<Utc>) -> String {
    let Some(created) = parse_timestamp(created_at) else {
        return created_at.to_string();
    };
    let seconds = (now - created).num_seconds();
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

/// A duration as `Xm Ys`, or `Ys` under a minute.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0s".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.round() as u64;
    let (minutes, secs) = (total / 60, total % 60);
    if minutes == 0 {
        format!("{secs}s")
    } else {
        format!("{minutes}m {secs}s")
    }
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str("...");
    cut
}
