//! Pure formatting helpers for sizes, rates, durations and the progress bar.
//!
//! Sizes use the decimal (1000-based) scale. Invalid input (negative, NaN,
//! infinite) formats as zero rather than failing.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Glyph for the filled part of the progress bar.
pub const BAR_FILLED: char = '█';
/// Glyph for the empty part of the progress bar.
pub const BAR_EMPTY: char = '░';

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Format byte count as human-readable size, e.g. `"1.50 MB"`.
///
/// Picks the smallest unit in which the rounded value is below 1000, up to GB.
pub fn format_size(bytes: f64) -> String {
    let mut value = sanitize(bytes);
    let mut unit = 0;
    let mut shown = format!("{:.2}", value);
    while unit < UNITS.len() - 1 && shown.parse::<f64>().is_ok_and(|v| v >= 1000.0) {
        value /= 1000.0;
        unit += 1;
        shown = format!("{:.2}", value);
    }
    format!("{} {}", shown, UNITS[unit])
}

/// Format bytes-per-second rate, e.g. `"12.30 MB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_size(bytes_per_sec))
}

/// Format seconds as `"Ns"`, `"NmNs"` or `"NhNmNs"` (whole seconds, floored).
pub fn format_time(seconds: f64) -> String {
    let secs = sanitize(seconds) as u64;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Number of filled cells for `percent` on a bar of `width` cells.
pub fn filled_cells(percent: f64, width: usize) -> usize {
    let pct = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    ((pct / 100.0 * width as f64).round() as usize).min(width)
}

/// Draws a bar of exactly `width` glyphs.
pub fn draw_progress_bar(percent: f64, width: usize) -> String {
    let filled = filled_cells(percent, width);
    let mut bar = String::with_capacity(width * BAR_FILLED.len_utf8());
    bar.extend(std::iter::repeat(BAR_FILLED).take(filled));
    bar.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    bar
}
