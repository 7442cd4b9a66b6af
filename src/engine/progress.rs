//! Encoder diagnostic-stream progress parsing

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::time::parse_clock;

/// Marker preceding the elapsed-time value in the encoder's status line
pub const TIME_MARKER: &str = "time=";

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)time=\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").expect("valid time regex")
});

/// Stateless parser for encoder status lines such as
/// `frame=  100 fps= 30 q=28.0 size=  1024kB time=00:00:10.00 bitrate=...`
pub struct ProgressParser;

impl ProgressParser {
    /// Elapsed encode time in seconds, or `None` when the line has no
    /// usable timestamp (`time=N/A`, negative values, unrelated output).
    pub fn elapsed(line: &str) -> Option<f64> {
        if !line.contains(TIME_MARKER) {
            return None;
        }
        let captures = TIME_RE.captures(line)?;
        parse_clock(captures.get(1)?.as_str())
    }

    /// Fraction of `duration` covered by the line's timestamp, capped at 1.0
    pub fn fraction(line: &str, duration: f64) -> Option<f64> {
        if !(duration.is_finite() && duration > 0.0) {
            return None;
        }
        Self::elapsed(line).map(|elapsed| (elapsed / duration).min(1.0))
    }
}
