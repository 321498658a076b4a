//! Misc

pub mod announce;
pub mod call;
pub mod youtube;

use std::time::Duration;

/// Helper function to format a duration.
pub fn format_duration(dur: &Duration) -> String {
    let total_secs = dur.as_secs();
    let total_mins = total_secs / 60;

    let hours = total_mins / 60;
    let mins = total_mins % 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("[{hours:02}h:{mins:02}m:{secs:02}s]")
    } else {
        format!("[{mins:02}m:{secs:02}s]")
    }
}

/// Spell out a duration, e.g. `1 hours, 2 seconds`. Zero parts are left out.
pub fn spell_duration(dur: &Duration) -> String {
    let total_secs = dur.as_secs();

    let days = total_secs / 86_400;
    let hours = total_secs / 3600 % 24;
    let mins = total_secs / 60 % 60;
    let secs = total_secs % 60;

    let parts = [
        (days, "days"),
        (hours, "hours"),
        (mins, "minutes"),
        (secs, "seconds"),
    ];

    let spelled = parts
        .iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| format!("{amount} {unit}"))
        .collect::<Vec<_>>()
        .join(", ");

    if spelled.is_empty() {
        "Live".to_string()
    } else {
        spelled
    }
}
