//! Fallback chain evaluation

use super::Matcher;
use crate::session::DomQuery;
use url::Url;

/// Evaluates a fallback chain and returns the first valid value
///
/// Matchers are tried in order. For each one, every element it selects is
/// captured and transformed, and the first value passing the matcher's
/// validity predicates wins. Returns None when the chain is exhausted.
///
/// # Arguments
///
/// * `chain` - Ordered fallback chain
/// * `dom` - The DOM snapshot to query
/// * `base_url` - Base URL for `resolve-url` transforms
pub fn resolve<D>(chain: &[Matcher], dom: &D, base_url: &Url) -> Option<String>
where
    D: DomQuery + ?Sized,
{
    resolve_with(chain, dom, base_url, |_| true)
}

/// Like [`resolve`], with an extra predicate every value must also satisfy
///
/// Used for chain-wide rules such as the image denylist, which apply on top
/// of each matcher's own predicates.
pub fn resolve_with<D, G>(chain: &[Matcher], dom: &D, base_url: &Url, guard: G) -> Option<String>
where
    D: DomQuery + ?Sized,
    G: Fn(&str) -> bool,
{
    chain.iter().find_map(|matcher| {
        candidates(matcher, dom, base_url)
            .into_iter()
            .find(|value| matcher.accepts(value) && guard(value))
    })
}

/// Returns every valid value of the first matcher that yields any
///
/// Listing pages need all links, not just the first; the fallback order
/// still decides which strategy is used.
pub fn resolve_all<D>(chain: &[Matcher], dom: &D, base_url: &Url) -> Vec<String>
where
    D: DomQuery + ?Sized,
{
    for matcher in chain {
        let values: Vec<String> = candidates(matcher, dom, base_url)
            .into_iter()
            .filter(|value| matcher.accepts(value))
            .collect();

        if !values.is_empty() {
            return values;
        }
    }

    Vec::new()
}

fn candidates<D>(matcher: &Matcher, dom: &D, base_url: &Url) -> Vec<String>
where
    D: DomQuery + ?Sized,
{
    let captured = dom.capture_all(&matcher.selector, &matcher.capture);

    let captured = match matcher.join {
        Some(count) if !captured.is_empty() => {
            let joined = captured
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .take(count)
                .collect::<Vec<_>>()
                .join(" ");
            vec![joined]
        }
        _ => captured,
    };

    captured
        .into_iter()
        .filter_map(|value| matcher.transform(value, base_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Capture, Transform};
    use crate::session::HtmlSnapshot;

    fn base_url() -> Url {
        Url::parse("https://www.example.com/kampanyalar").unwrap()
    }

    fn snapshot(body: &str) -> HtmlSnapshot {
        HtmlSnapshot::parse(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_first_matcher_wins_regardless_of_second() {
        let dom = snapshot(r#"<h1>A Başlık</h1><h2 class="b">B Başlık</h2>"#);
        let chain = vec![Matcher::new("h1"), Matcher::new("h2.b")];
        assert_eq!(resolve(&chain, &dom, &base_url()).as_deref(), Some("A Başlık"));
    }

    #[test]
    fn test_falls_through_to_second_matcher() {
        let dom = snapshot(r#"<h2 class="b">B Başlık</h2>"#);
        let chain = vec![Matcher::new("h1"), Matcher::new("h2.b")];
        assert_eq!(resolve(&chain, &dom, &base_url()).as_deref(), Some("B Başlık"));
    }

    #[test]
    fn test_invalid_value_falls_through() {
        let dom = snapshot(r#"<h1>   </h1><h2>Gerçek Başlık</h2>"#);
        let chain = vec![Matcher::new("h1"), Matcher::new("h2")];
        assert_eq!(
            resolve(&chain, &dom, &base_url()).as_deref(),
            Some("Gerçek Başlık")
        );
    }

    #[test]
    fn test_exhausted_chain_is_absent() {
        let dom = snapshot("<p>yok</p>");
        let chain = vec![Matcher::new("h1"), Matcher::new(".title")];
        assert_eq!(resolve(&chain, &dom, &base_url()), None);
        assert_eq!(resolve(&[], &dom, &base_url()), None);
    }

    #[test]
    fn test_later_element_of_same_matcher() {
        let dom = snapshot(
            r#"<img src="/img/logo.png"><img src="/content/dam/kampanya.jpg">"#,
        );
        let chain = vec![Matcher::attr("img", "src")
            .with_transform(Transform::ResolveUrl)
            .with_reject(["logo"])];
        assert_eq!(
            resolve(&chain, &dom, &base_url()).as_deref(),
            Some("https://www.example.com/content/dam/kampanya.jpg")
        );
    }

    #[test]
    fn test_guard_applies_on_top_of_predicates() {
        let dom = snapshot(r#"<img class="a" src="/icon.png"><img class="b" src="/real.jpg">"#);
        let chain = vec![Matcher::attr("img.a", "src"), Matcher::attr("img.b", "src")];
        let value = resolve_with(&chain, &dom, &base_url(), |v| !v.contains("icon"));
        assert_eq!(value.as_deref(), Some("/real.jpg"));
    }

    #[test]
    fn test_join_first_paragraphs() {
        let dom = snapshot("<p>Birinci.</p><p> </p><p>İkinci.</p><p>Üçüncü.</p>");
        let chain = vec![Matcher::new("p").with_join(2)];
        assert_eq!(
            resolve(&chain, &dom, &base_url()).as_deref(),
            Some("Birinci. İkinci.")
        );
    }

    #[test]
    fn test_resolve_all_uses_first_productive_matcher() {
        let dom = snapshot(
            r##"<div class="card"><a href="/k/1">1</a><a href="/k/2">2</a></div>
               <a class="backup" href="/k/9">9</a>"##,
        );
        let chain = vec![
            Matcher::attr(".missing a", "href"),
            Matcher::attr(".card a", "href"),
            Matcher::attr("a.backup", "href"),
        ];
        assert_eq!(resolve_all(&chain, &dom, &base_url()), vec!["/k/1", "/k/2"]);
    }

    #[test]
    fn test_capture_inner_html() {
        let dom = snapshot(r#"<div class="detail"><p>Koşullar</p></div>"#);
        let chain = vec![Matcher::new(".detail").with_capture(Capture::InnerHtml)];
        assert_eq!(
            resolve(&chain, &dom, &base_url()).as_deref(),
            Some("<p>Koşullar</p>")
        );
    }

    #[test]
    fn test_deterministic_for_fixed_snapshot() {
        let dom = snapshot("<h1>Aynı</h1><h1>Farklı</h1>");
        let chain = vec![Matcher::new("h1")];
        let first = resolve(&chain, &dom, &base_url());
        for _ in 0..5 {
            assert_eq!(resolve(&chain, &dom, &base_url()), first);
        }
    }
}
