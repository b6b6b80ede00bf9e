/// Display formatting for byte counts and durations.
///
/// Sizes are `u64` bytes internally; floating point only appears at the
/// formatting boundary.

/// Format a byte count with binary units (1 KB = 1024 bytes).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit >= 2 {
        format!("{value:.2} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Format an optional size, rendering `-` when unknown.
pub fn format_optional_size(bytes: Option<u64>) -> String {
    bytes.map(format_size).unwrap_or_else(|| "-".to_owned())
}

/// Format a processing time in milliseconds as `850 ms`, `4.2 s` or `3m 05s`.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms} ms")
    } else if ms < 60_000 {
        format!("{:.1} s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_below_one_kilobyte_are_exact() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn larger_sizes_pick_the_right_unit() {
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1_099_511_627_776), "1.00 TB");
    }

    #[test]
    fn unknown_size_renders_a_placeholder() {
        assert_eq!(format_optional_size(None), "-");
        assert_eq!(format_optional_size(Some(10)), "10 B");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration_ms(850), "850 ms");
        assert_eq!(format_duration_ms(4_200), "4.2 s");
        assert_eq!(format_duration_ms(185_000), "3m 05s");
    }
}
