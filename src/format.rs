use std::time::Duration;

/// `MM:SS` from whole seconds, truncating any fraction
pub fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Abbreviated minutes/seconds, e.g. `1m 5s`, `45s`, `2m`.
pub fn abbreviated(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let (m, s) = (total / 60, total % 60);
    match (m, s) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        assert_eq!(clock(Duration::from_secs(0)), "00:00");
        assert_eq!(clock(Duration::from_millis(59_900)), "00:59");
        assert_eq!(clock(Duration::from_secs(60)), "01:00");
        assert_eq!(clock(Duration::from_secs(305)), "05:05");
    }

    #[test]
    fn test_abbreviated() {
        assert_eq!(abbreviated(0.0), "0s");
        assert_eq!(abbreviated(45.2), "45s");
        assert_eq!(abbreviated(60.0), "1m");
        assert_eq!(abbreviated(65.0), "1m 5s");
        assert_eq!(abbreviated(-3.0), "0s");
        assert_eq!(abbreviated(f64::NAN), "0s");
    }
}
