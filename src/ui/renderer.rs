// Formatting helpers shared by the tab tables

use crate::event::Vitals;

/// Format a vitals triplet as `health/armor/power`
pub fn format_vitals(vitals: Vitals) -> String {
    format!("{}/{}/{}", vitals.health, vitals.armor, vitals.power)
}

/// Format a per-second rate for a table title
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}/s", rate)
}

/// Relative bar scaled against `max`, `width` cells wide
pub fn bar(value: i64, max: i64, width: usize) -> String {
    if max <= 0 || width == 0 {
        return String::new();
    }
    let ratio = (value.saturating_abs() as f64 / max as f64).min(1.0);
    let filled = (ratio * width as f64).round() as usize;
    "█".repeat(filled)
}

/// `part` as a percentage of `whole`, one decimal
pub fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}
