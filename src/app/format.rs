use chrono::{DateTime, Local};

use crate::identity::ContentIdentity;
use crate::store::DisplayMode;

/// Speed range offered by the original player controls.
pub(crate) const MIN_RATE: f64 = 0.1;
pub(crate) const MAX_RATE: f64 = 16.0;

pub(crate) fn clamp_rate(rate: f64) -> f64 {
    if !rate.is_finite() || rate <= 0.0 {
        return 1.0;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

pub(crate) fn clamp_position(seconds: f64) -> f64 {
    if !seconds.is_finite() || seconds < 0.0 {
        return 0.0;
    }
    seconds
}

/// Seconds to `(h:)mm:ss`, hours omitted when zero.
pub(crate) fn format_position(seconds: f64) -> String {
    let total = clamp_position(seconds) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Position column text: the remaining-time readout needs the media duration,
/// which only the player knows, so that mode is shown as a tag on the
/// elapsed value.
pub(crate) fn format_position_with_mode(seconds: f64, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Elapsed => format_position(seconds),
        DisplayMode::Remaining => format!("{} (rem.)", format_position(seconds)),
    }
}

pub(crate) fn format_rate(rate: f64) -> String {
    format!("{:.2}x", clamp_rate(rate))
}

pub(crate) fn format_last_opened_display(last_opened_at_ms: i64) -> String {
    DateTime::from_timestamp_millis(last_opened_at_ms)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// First few digest chars, enough to tell entries apart in a table.
pub(crate) fn short_identity(identity: &ContentIdentity) -> String {
    identity.as_str().chars().take(12).collect()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
