use time::OffsetDateTime;

/// Human-readable time left until `expires_at`, e.g. `"1h 2m 3s"`.
///
/// Leading zero units are omitted. Returns `None` once expired.
pub fn format_time_remaining(expires_at: OffsetDateTime, now: OffsetDateTime) -> Option<String> {
    let left = expires_at - now;
    if left <= time::Duration::ZERO {
        return None;
    }

    let total = left.whole_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    Some(match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m {seconds}s"),
        _ => format!("{hours}h {minutes}m {seconds}s"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_format_time_remaining() {
        let now = datetime!(2025-01-01 12:00:00 UTC);
        let after = |secs| format_time_remaining(now + time::Duration::seconds(secs), now);

        assert_eq!(after(3723).as_deref(), Some("1h 2m 3s"));
        assert_eq!(after(3600).as_deref(), Some("1h 0m 0s"));
        assert_eq!(after(123).as_deref(), Some("2m 3s"));
        assert_eq!(after(3).as_deref(), Some("3s"));
        assert_eq!(after(25 * 3600).as_deref(), Some("25h 0m 0s"));
        assert_eq!(after(0), None);
        assert_eq!(after(-10), None);
    }

    #[test]
    fn test_sub_second_remainder() {
        let now = datetime!(2025-01-01 12:00:00 UTC);
        let expires = now + time::Duration::milliseconds(500);
        assert_eq!(format_time_remaining(expires, now).as_deref(), Some("0s"));
    }
}
