//! Clock-style time parsing and formatting utilities

/// Parse an `HH:MM:SS` or `HH:MM:SS.frac` clock value to seconds.
///
/// The fractional part is read as a decimal fraction, so `00:01:30.50` is
/// 90.5 seconds. Returns `None` for anything malformed or negative.
pub fn parse_clock(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parse_digits(parts[0])?;
    let minutes: u64 = parse_digits(parts[1])?;
    if minutes >= 60 {
        return None;
    }

    let (whole, fraction) = match parts[2].split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (parts[2], None),
    };
    let seconds: u64 = parse_digits(whole)?;
    if seconds >= 60 {
        return None;
    }

    let fraction = match fraction {
        Some(digits) => {
            parse_digits::<u64>(digits)?;
            format!("0.{}", digits).parse::<f64>().ok()?
        }
        None => 0.0,
    };

    Some((hours * 3600 + minutes * 60 + seconds) as f64 + fraction)
}

fn parse_digits<T: std::str::FromStr>(value: &str) -> Option<T> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Format seconds as `HH:MM:SS` (or `MM:SS` under an hour)
pub fn format_clock(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
