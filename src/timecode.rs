//! Video duration text handling for the time readout.

/// Render seconds as `H:MM:SS` from one hour upward, otherwise `M:SS`.
pub fn format_time(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Parse `MM:SS` or `HH:MM:SS` into seconds. Anything else yields 0.
pub fn parse_duration(text: &str) -> u64 {
    let parts: Option<Vec<u64>> = text
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>().ok())
        .collect();
    match parts.as_deref() {
        Some([m, s]) => m.saturating_mul(60).saturating_add(*s),
        Some([h, m, s]) => h
            .saturating_mul(3600)
            .saturating_add(m.saturating_mul(60))
            .saturating_add(*s),
        _ => 0,
    }
}

/// Keep only digits and colons, dropping icon glyphs and labels.
pub fn sanitize_duration_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect()
}

/// Readout shown under the overlay: `current / total`.
pub fn time_label(current: u64, total: u64) -> String {
    format!("{} / {}", format_time(current), format_time(total))
}
