//! Human-readable durations and usage bars.

/// Format seconds as a compact duration.
///
/// Seconds are kept below one hour and dropped once hours are shown:
/// `30s`, `1m`, `1m 30s`, `1h`, `1h 1m`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let mins = seconds / 60;
        let secs = seconds % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        hours_and_minutes(seconds)
    }
}

/// Format seconds with minute granularity (`45s`, `12m`, `2h 5m`)
pub fn format_duration_short(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        hours_and_minutes(seconds)
    }
}

fn hours_and_minutes(seconds: i64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    if mins > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

/// Render a utilization percentage as a fixed-width bar
pub fn format_bar(percent: f64, width: usize) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64) as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
