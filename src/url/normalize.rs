use crate::UrlError;
use url::{form_urlencoded, Url};

/// List of tracking query parameters to remove during canonicalisation
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Canonicalises an absolute campaign URL for deduplication and storage
///
/// # Canonicalisation Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Remove fragment (everything after #)
/// 4. Remove tracking query parameters, keeping the rest verbatim and in order
/// 5. Remove empty query string (trailing ?)
///
/// Scheme, host and path are kept as the site serves them: the canonical
/// form must still be navigable, and it becomes the record's reference URL.
///
/// # Examples
///
/// ```
/// use campaign_sieve::url::canonicalize_link;
///
/// let url = canonicalize_link("https://www.example.com/kampanya/1?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/kampanya/1");
/// ```
pub fn canonicalize_link(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let segments: Vec<&str> = query.split('&').filter(|s| !s.is_empty()).collect();
        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|segment| !is_tracking_segment(segment))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() < segments.len() {
            let rebuilt = kept.join("&");
            url.set_query(Some(&rebuilt));
        }
    }

    Ok(url)
}

/// Checks whether a raw `key=value` query segment carries a tracking parameter
///
/// Only the key is decoded; the segment itself is kept byte for byte so the
/// site's own encoding survives canonicalisation.
fn is_tracking_segment(segment: &str) -> bool {
    let key = segment.split('=').next().unwrap_or_default();
    let decoded: String = form_urlencoded::parse(key.as_bytes())
        .map(|(k, _)| k.into_owned())
        .next()
        .unwrap_or_default();
    is_tracking_param(&decoded)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = canonicalize_link("https://example.com/kampanya#detay").unwrap();
        assert_eq!(result.as_str(), "https://example.com/kampanya");
    }

    #[test]
    fn test_keeps_scheme_and_www() {
        let result = canonicalize_link("http://www.example.com/kampanya").unwrap();
        assert_eq!(result.as_str(), "http://www.example.com/kampanya");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = canonicalize_link("https://example.com/k?utm_source=twitter").unwrap();
        assert_eq!(result.as_str(), "https://example.com/k");
    }

    #[test]
    fn test_keeps_param_order() {
        let result =
            canonicalize_link("https://example.com/k?b=2&utm_medium=mail&a=1&fbclid=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/k?b=2&a=1");
    }

    #[test]
    fn test_untouched_query_keeps_encoding() {
        let result = canonicalize_link("https://x.com/k?id=a%2Fb&flag").unwrap();
        assert_eq!(result.as_str(), "https://x.com/k?id=a%2Fb&flag");

        let result = canonicalize_link("https://x.com/k?q=a+b%20c").unwrap();
        assert_eq!(result.as_str(), "https://x.com/k?q=a+b%20c");
    }

    #[test]
    fn test_removing_tracking_keeps_other_segments_verbatim() {
        let result =
            canonicalize_link("https://x.com/k?id=a%2Fb&utm_source=x&flag&q=a+b%20c").unwrap();
        assert_eq!(result.as_str(), "https://x.com/k?id=a%2Fb&flag&q=a+b%20c");
    }

    #[test]
    fn test_empty_query_is_dropped() {
        let result = canonicalize_link("https://x.com/k?").unwrap();
        assert_eq!(result.as_str(), "https://x.com/k");
    }

    #[test]
    fn test_custom_utm_param() {
        let result = canonicalize_link("https://example.com/k?utm_custom=value").unwrap();
        assert_eq!(result.as_str(), "https://example.com/k");
    }

    #[test]
    fn test_lowercase_host() {
        let result = canonicalize_link("https://EXAMPLE.COM/Kampanya").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Kampanya");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = canonicalize_link("ftp://example.com/file");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(canonicalize_link("not a url").is_err());
    }
}
