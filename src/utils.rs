//! Small pure helpers shared by the pipeline and the extractor.
//!
//! - Collection naming from a URL's authority
//! - Timestamp rendering with an explicit numeric offset
//! - Whitespace normalization of scraped text
//! - String truncation for logging

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};

/// Layout used for every timestamp written to the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Map a URL to the name of the collection its documents are stored in.
///
/// The collection name is the URL authority (host, plus `:port` when a
/// non-default port is given) with every `.` replaced by `_`. Path, query,
/// fragment and userinfo do not take part.
///
/// # Errors
///
/// Fails on unparseable URLs and on URLs without a host (`mailto:`, `data:`).
///
/// # Examples
///
/// ```ignore
/// assert_eq!(url_to_collection("https://www.npr.org/2024/x")?, "www_npr_org");
/// assert_eq!(url_to_collection("http://example.com:8080/")?, "example_com:8080");
/// ```
pub fn url_to_collection(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::MissingHost(url.to_string()))?;

    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok(authority.replace('.', "_"))
}

/// A point in time that may or may not carry a UTC offset.
///
/// Values without an offset are pinned to UTC; values with one keep it.
pub trait IntoZoned {
    fn into_zoned(self) -> DateTime<FixedOffset>;
}

impl IntoZoned for NaiveDateTime {
    fn into_zoned(self) -> DateTime<FixedOffset> {
        self.and_utc().fixed_offset()
    }
}

impl<Tz: TimeZone> IntoZoned for DateTime<Tz> {
    fn into_zoned(self) -> DateTime<FixedOffset> {
        self.fixed_offset()
    }
}

/// Render a point in time as `YYYY-MM-DDTHH:MM:SS±HHMM`.
///
/// A missing offset is filled in as `+0000`. An existing offset is kept as-is;
/// no conversion between zones happens here.
pub fn format_timestamp(dt: impl IntoZoned) -> String {
    dt.into_zoned().format(TIMESTAMP_FORMAT).to_string()
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_ws(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a char boundary) with
/// `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_collection_from_subdomain() {
        assert_eq!(
            url_to_collection("https://sub.example.com/a/b?q=1#frag").unwrap(),
            "sub_example_com"
        );
    }

    #[test]
    fn test_collection_keeps_explicit_port() {
        assert_eq!(
            url_to_collection("http://example.com:8080/path").unwrap(),
            "example_com:8080"
        );
        assert_eq!(
            url_to_collection("https://sub.example.com:8443").unwrap(),
            "sub_example_com:8443"
        );
    }

    #[test]
    fn test_collection_drops_default_port_and_userinfo() {
        assert_eq!(
            url_to_collection("https://user:pw@example.com:443/").unwrap(),
            "example_com"
        );
    }

    #[test]
    fn test_collection_for_real_targets() {
        assert_eq!(
            url_to_collection(
                "https://apnews.com/article/south-korea-martial-law-3210438b8663fe609bfe4cb8b748a114"
            )
            .unwrap(),
            "apnews_com"
        );
        assert_eq!(
            url_to_collection("https://www.npr.org/2024/12/11/1218506698/code-switch-black-utopians")
                .unwrap(),
            "www_npr_org"
        );
    }

    #[test]
    fn test_collection_rejects_bad_urls() {
        assert!(matches!(
            url_to_collection("not a url"),
            Err(AppError::Url(_))
        ));
        assert!(matches!(
            url_to_collection("mailto:someone@example.com"),
            Err(AppError::MissingHost(_))
        ));
    }

    #[test]
    fn test_naive_timestamp_gets_utc_offset() {
        let naive = NaiveDate::from_ymd_opt(2024, 12, 11)
            .unwrap()
            .and_hms_micro_opt(9, 5, 7, 123_456)
            .unwrap();
        assert_eq!(format_timestamp(naive), "2024-12-11T09:05:07+0000");
    }

    #[test]
    fn test_explicit_offset_is_preserved() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let dt = ist.with_ymd_and_hms(2024, 12, 11, 18, 0, 0).unwrap();
        let s = format_timestamp(dt);
        assert_eq!(s, "2024-12-11T18:00:00+0530");
    }

    #[test]
    fn test_negative_offset_is_preserved() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let dt = est.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(dt), "2024-01-02T03:04:05-0500");
    }

    #[test]
    fn test_utc_now_ends_with_zero_offset() {
        let s = format_timestamp(Utc::now());
        assert!(s.ends_with("+0000"));
        assert_eq!(s.len(), "2024-12-11T09:05:07+0000".len());
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "ééé";
        assert_eq!(truncate_for_log(s, 3), "é…(+4 bytes)");
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a\n\t b   c "), "a b c");
        assert_eq!(normalize_ws(""), "");
    }
}
