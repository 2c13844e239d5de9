use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

/// Quoted ETag derived from the response bytes.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// RFC 7231 HTTP-date for `Last-Modified`.
pub fn last_modified(timestamp: DateTime<Utc>) -> Option<HeaderValue> {
    HeaderValue::from_str(&timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()).ok()
}

/// Returns true when `If-None-Match` contains `*` or the exact current ETag.
pub fn if_none_match_matches(headers: &HeaderMap, current_etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(|tag| tag.trim())
                .any(|tag| tag == "*" || tag == current_etag)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn etag_is_quoted_and_content_addressed() {
        let first = compute_etag(br#"[{"status":"failed"}]"#);
        let second = compute_etag(br#"[{"status":"success"}]"#);
        assert!(first.starts_with('"') && first.ends_with('"'));
        assert_ne!(first, second);
        assert_eq!(first, compute_etag(br#"[{"status":"failed"}]"#));
    }

    #[test]
    fn last_modified_is_an_http_date() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(
            last_modified(timestamp).unwrap(),
            HeaderValue::from_static("Fri, 07 Mar 2025 09:05:00 GMT")
        );
    }

    #[test]
    fn if_none_match_accepts_lists_and_wildcards() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"old\", \"abc\""));
        assert!(if_none_match_matches(&headers, "\"abc\""));
        assert!(!if_none_match_matches(&headers, "\"def\""));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(if_none_match_matches(&headers, "\"anything\""));

        assert!(!if_none_match_matches(&HeaderMap::new(), "\"abc\""));
    }
}
