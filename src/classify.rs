use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

const BODY_PREVIEW_CHARS: usize = 500;

/// Phrases found in CDN block pages (lowercase).
pub const DEFAULT_BLOCK_MARKERS: &[&str] = &[
    "cloudflare",
    "error 1006",
    "access denied",
    "banned your ip address",
];

/// Decides whether a 403 body is an edge-proxy denial rather than an
/// application-level refusal.
pub trait BlockDetector: Send + Sync {
    fn is_blocked(&self, body: &str) -> bool;
}

impl<F> BlockDetector for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_blocked(&self, body: &str) -> bool {
        self(body)
    }
}

/// Case-insensitive substring match against a fixed marker set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerBlockDetector {
    markers: Vec<String>,
}

impl MarkerBlockDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|marker| marker.as_ref().to_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect(),
        }
    }
}

impl Default for MarkerBlockDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_MARKERS)
    }
}

impl BlockDetector for MarkerBlockDetector {
    fn is_blocked(&self, body: &str) -> bool {
        let lowered = body.to_lowercase();
        self.markers.iter().any(|marker| lowered.contains(marker))
    }
}

/// Classification of a single attempt.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx with the raw response body.
    Success(String),
    /// 429, with the `Retry-After` hint when it was numeric.
    RateLimited { retry_after: Option<Duration> },
    /// 403 whose body carries an edge-block marker.
    EdgeBlocked,
    /// 5xx.
    ServerTransient { status: u16 },
    /// Anything else; never retried.
    ClientFatal { status: u16, body_preview: String },
    /// No response was obtained.
    NetworkFailure(reqwest::Error),
}

/// Maps a received response onto the failure taxonomy.
pub fn classify(
    status: u16,
    headers: &HeaderMap,
    body: String,
    detector: &dyn BlockDetector,
) -> Outcome {
    match status {
        200..=299 => Outcome::Success(body),
        429 => Outcome::RateLimited {
            retry_after: parse_retry_after(headers),
        },
        403 if detector.is_blocked(&body) => Outcome::EdgeBlocked,
        500..=599 => Outcome::ServerTransient { status },
        _ => Outcome::ClientFatal {
            status,
            body_preview: body_preview(&body),
        },
    }
}

/// Reads `Retry-After` as (possibly fractional) seconds. HTTP-date values and
/// garbage yield `None`, which falls back to exponential backoff.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// First 500 characters of a body, cut on a char boundary.
pub fn body_preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((cut, _)) => body[..cut].to_owned(),
        None => body.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{body_preview, classify, parse_retry_after, MarkerBlockDetector, Outcome};

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).expect("valid header"));
        headers
    }

    #[test]
    fn success_range_keeps_body() {
        let detector = MarkerBlockDetector::default();
        match classify(204, &HeaderMap::new(), String::new(), &detector) {
            Outcome::Success(body) => assert!(body.is_empty()),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn rate_limit_reads_retry_after_seconds() {
        let detector = MarkerBlockDetector::default();
        let outcome = classify(429, &headers_with_retry_after("5"), String::new(), &detector);
        assert!(matches!(
            outcome,
            Outcome::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(5)
        ));
    }

    #[test]
    fn retry_after_ignores_http_dates_and_negatives() {
        assert_eq!(
            parse_retry_after(&headers_with_retry_after("Wed, 21 Oct 2026 07:28:00 GMT")),
            None
        );
        assert_eq!(parse_retry_after(&headers_with_retry_after("-3")), None);
        assert_eq!(
            parse_retry_after(&headers_with_retry_after(" 1.5 ")),
            Some(Duration::from_millis(1_500))
        );
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn forbidden_with_marker_is_edge_block() {
        let detector = MarkerBlockDetector::default();
        for body in [
            "<html><title>Attention Required! | CloudFlare</title></html>",
            "Error 1006: ACCESS DENIED",
            "The owner of this website has banned your IP address",
        ] {
            let outcome = classify(403, &HeaderMap::new(), body.to_owned(), &detector);
            assert!(matches!(outcome, Outcome::EdgeBlocked), "{body}");
        }
    }

    #[test]
    fn forbidden_without_marker_is_fatal() {
        let detector = MarkerBlockDetector::default();
        let body = r#"{"status":"error","category":"MISSING_SCOPES"}"#;
        match classify(403, &HeaderMap::new(), body.to_owned(), &detector) {
            Outcome::ClientFatal {
                status,
                body_preview,
            } => {
                assert_eq!(status, 403);
                assert_eq!(body_preview, body);
            }
            other => panic!("expected fatal, got {other:?}"),
        }
    }

    #[test]
    fn markers_only_matter_on_403() {
        let detector = MarkerBlockDetector::default();
        let outcome = classify(401, &HeaderMap::new(), "access denied".to_owned(), &detector);
        assert!(matches!(outcome, Outcome::ClientFatal { status: 401, .. }));
        let outcome = classify(502, &HeaderMap::new(), "cloudflare".to_owned(), &detector);
        assert!(matches!(outcome, Outcome::ServerTransient { status: 502 }));
    }

    #[test]
    fn custom_predicate_replaces_markers() {
        let detector = |body: &str| body.contains("edge says no");
        let outcome = classify(403, &HeaderMap::new(), "edge says no".to_owned(), &detector);
        assert!(matches!(outcome, Outcome::EdgeBlocked));
        let outcome = classify(403, &HeaderMap::new(), "cloudflare".to_owned(), &detector);
        assert!(matches!(outcome, Outcome::ClientFatal { .. }));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "ñ".repeat(600);
        let preview = body_preview(&body);
        assert_eq!(preview.chars().count(), 500);
        assert_eq!(body_preview("short"), "short");
    }
}
