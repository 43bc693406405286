//! Date normalization for source-specific date labels.
//!
//! Sources declare their date layout with a moment-style pattern such as
//! `YYYY-MM-DD` or `YYYY-MM-DD HH:mm`. The pattern is translated to a chrono
//! format string and the label is interpreted in the source's publication
//! timezone. Anything that does not match yields `None`; a missing date is
//! never an error.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

static PATTERN_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"YYYY|MM|DD|HH|mm|ss").expect("valid token regex"));

/// Translate a moment-style pattern into a chrono format string.
///
/// Returns the format and whether it carries a time-of-day component.
fn to_chrono_format(pattern: &str) -> (String, bool) {
    let mut has_time = false;
    let fmt = PATTERN_TOKENS
        .replace_all(pattern, |caps: &Captures| {
            let token = match &caps[0] {
                "YYYY" => "%Y",
                "MM" => "%m",
                "DD" => "%d",
                "HH" => {
                    has_time = true;
                    "%H"
                }
                "mm" => "%M",
                "ss" => "%S",
                other => other,
            };
            token.to_string()
        })
        .into_owned();
    (fmt, has_time)
}

/// Parse `raw` according to `pattern`, anchored to `tz`.
///
/// Date-only patterns resolve to midnight in `tz`.
///
/// # Examples
///
/// ```ignore
/// let tz = FixedOffset::east_opt(8 * 3600).unwrap();
/// assert!(parse_date("2024-03-05", "YYYY-MM-DD", tz).is_some());
/// assert!(parse_date("N/A", "YYYY-MM-DD", tz).is_none());
/// ```
pub fn parse_date(raw: &str, pattern: &str, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (fmt, has_time) = to_chrono_format(pattern);
    let naive = if has_time {
        NaiveDateTime::parse_from_str(raw, &fmt).ok()
    } else {
        NaiveDate::parse_from_str(raw, &fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    };

    let parsed = naive.and_then(|n| tz.from_local_datetime(&n).single());
    if parsed.is_none() {
        debug!(raw, pattern, "Date label did not match pattern");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_parse_day_granularity() {
        let dt = parse_date("2024-03-05", "YYYY-MM-DD", cst()).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 5));
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(dt.to_rfc3339(), "2024-03-05T00:00:00+08:00");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_date("  2024-03-05\n", "YYYY-MM-DD", cst()).is_some());
    }

    #[test]
    fn test_parse_with_time() {
        let dt = parse_date("2024-03-05 14:30", "YYYY-MM-DD HH:mm", cst()).unwrap();
        assert_eq!((dt.hour(), dt.minute()), (14, 30));
    }

    #[test]
    fn test_unparseable_yields_none() {
        assert!(parse_date("N/A", "YYYY-MM-DD", cst()).is_none());
        assert!(parse_date("", "YYYY-MM-DD", cst()).is_none());
        assert!(parse_date("2024-13-40", "YYYY-MM-DD", cst()).is_none());
    }

    #[test]
    fn test_pattern_translation() {
        assert_eq!(to_chrono_format("YYYY-MM-DD"), ("%Y-%m-%d".to_string(), false));
        assert_eq!(
            to_chrono_format("YYYY/MM/DD HH:mm:ss"),
            ("%Y/%m/%d %H:%M:%S".to_string(), true)
        );
    }
}
