use url::Url;

/// Resolves a link href to an absolute, canonical URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only hrefs (same page anchors)
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// # Example
///
/// ```
/// use campaign_sieve::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://www.example.com/kampanyalar").unwrap();
/// let link = resolve_link("/kampanyalar/yaz-firsati", &base).unwrap();
/// assert_eq!(link.as_str(), "https://www.example.com/kampanyalar/yaz-firsati");
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    super::canonicalize_link(absolute.as_str()).ok()
}

/// Resolves an asset reference (image src, CSS url) against the base URL
///
/// Unlike [`resolve_link`] the query string and fragment are left alone;
/// CDNs often encode the rendition in them.
pub fn resolve_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("data:") {
        return None;
    }

    let absolute = base_url.join(value).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.paraf.com.tr/tr/kampanyalar.html").unwrap()
    }

    #[test]
    fn test_absolute_link() {
        let link = resolve_link("https://other.com/page", &base_url()).unwrap();
        assert_eq!(link.as_str(), "https://other.com/page");
    }

    #[test]
    fn test_root_relative_link() {
        let link = resolve_link("/tr/kampanyalar/market.html", &base_url()).unwrap();
        assert_eq!(
            link.as_str(),
            "https://www.paraf.com.tr/tr/kampanyalar/market.html"
        );
    }

    #[test]
    fn test_path_relative_link() {
        let link = resolve_link("kampanyalar/market.html", &base_url()).unwrap();
        assert_eq!(
            link.as_str(),
            "https://www.paraf.com.tr/tr/kampanyalar/market.html"
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        for href in [
            "javascript:void(0)",
            "mailto:test@example.com",
            "tel:+901234567",
            "data:text/html,<h1>x</h1>",
        ] {
            assert!(resolve_link(href, &base_url()).is_none(), "{href}");
        }
    }

    #[test]
    fn test_skip_fragment_only_and_empty() {
        assert!(resolve_link("#top", &base_url()).is_none());
        assert!(resolve_link("   ", &base_url()).is_none());
    }

    #[test]
    fn test_link_is_canonicalised() {
        let link = resolve_link("/k/1?utm_source=list#x", &base_url()).unwrap();
        assert_eq!(link.as_str(), "https://www.paraf.com.tr/k/1");
    }

    #[test]
    fn test_resolve_asset_keeps_query() {
        let url = resolve_url("/content/dam/banner.jpg?w=800", &base_url()).unwrap();
        assert_eq!(
            url,
            "https://www.paraf.com.tr/content/dam/banner.jpg?w=800"
        );
    }

    #[test]
    fn test_resolve_protocol_relative_asset() {
        let url = resolve_url("//cdn.example.com/a.png", &base_url()).unwrap();
        assert_eq!(url, "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_resolve_asset_rejects_data_uri() {
        assert!(resolve_url("data:image/png;base64,AAAA", &base_url()).is_none());
    }
}
