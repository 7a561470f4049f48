//! Site profile registry and search-page candidate discovery.
//!
//! Profiles are matched by case-insensitive substring of the site host, in
//! registry order, so country-specific entries must precede the bare brand.
//! Resolution never fails: unknown hosts get [`GENERIC`].

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// RFC 3986 unreserved characters and `/` pass through unencoded.
const SEARCH_TERM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

const PRODUCT_DETAIL_SELECTORS: &[&str] = &[
    r#"[data-testid*="product"]"#,
    ".product-details",
    ".product-info",
    ".item-details",
    "#product-description",
    ".part-details",
    ".component-info",
];

const GENERIC_LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/product"]"#,
    r#"a[href*="/item"]"#,
    r#"a[href*="/p/"]"#,
    ".product-link",
    ".item-link",
];

const EBAY_LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/itm/"]"#,
    ".s-item__link",
    ".x-item-title-label",
];

const DIGIKEY_LINK_SELECTORS: &[&str] =
    &[r#"a[href*="/product-detail/"]"#, ".product-details-link"];

const RS_LINK_SELECTORS: &[&str] = &[r#"a[href*="/product/"]"#, ".product-result-link"];

const MOUSER_LINK_SELECTORS: &[&str] = &[
    r#"a[href*="/ProductDetail/"]"#,
    r#"a[href*="/product"]"#,
    ".product-link",
];

const EBAY_CONTEXT: &str =
    "eBay marketplace - focus on auction/buy-it-now prices, seller ratings, condition";
const DIGIKEY_CONTEXT: &str =
    "DigiKey electronics distributor - part numbers, specifications, quantity breaks";
const RS_CONTEXT: &str =
    "RS Components - electronic components with technical specs and quantity pricing";
const GENERIC_CONTEXT: &str = "General e-commerce site";

/// Static description of how to search and read one site.
#[derive(Debug, PartialEq, Eq)]
pub struct SiteProfile {
    pub id: &'static str,
    /// Host fragments; any match selects this profile.
    pub domains: &'static [&'static str],
    /// `{origin}` is the site's scheme and host, `{site}` the submitted URL
    /// with any path kept, `{term}` the percent-encoded search term.
    pub search_template: &'static str,
    /// Ordered selector sets; the first yielding any link wins.
    pub link_selectors: &'static [&'static str],
    /// Ordered product container selectors used by normalization.
    pub detail_selectors: &'static [&'static str],
    /// Prompt hint describing the kind of site.
    pub context: &'static str,
}

impl SiteProfile {
    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|d| host.contains(d))
    }

    /// Expand the search template for `site_url` and `term`.
    pub fn search_url(&self, site_url: &str, term: &str) -> String {
        let encoded = utf8_percent_encode(term, SEARCH_TERM).to_string();
        self.search_template
            .replace("{origin}", &site_origin(site_url))
            .replace("{site}", site_url.trim().trim_end_matches('/'))
            .replace("{term}", &encoded)
    }
}

pub static PROFILES: &[SiteProfile] = &[
    SiteProfile {
        id: "ebay-de",
        domains: &["ebay.de"],
        search_template: "https://www.ebay.de/sch/i.html?_nkw={term}",
        link_selectors: EBAY_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: EBAY_CONTEXT,
    },
    SiteProfile {
        id: "ebay-com",
        domains: &["ebay.com"],
        search_template: "https://www.ebay.com/sch/i.html?_nkw={term}",
        link_selectors: EBAY_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: EBAY_CONTEXT,
    },
    SiteProfile {
        id: "ebay",
        domains: &["ebay."],
        search_template: "{origin}/sch/i.html?_nkw={term}",
        link_selectors: EBAY_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: EBAY_CONTEXT,
    },
    SiteProfile {
        id: "digikey-de",
        domains: &["digikey.de"],
        search_template: "https://www.digikey.de/de/products/filter?keywords={term}",
        link_selectors: DIGIKEY_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: DIGIKEY_CONTEXT,
    },
    SiteProfile {
        id: "digikey",
        domains: &["digikey."],
        search_template: "https://www.digikey.com/en/products/filter?keywords={term}",
        link_selectors: DIGIKEY_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: DIGIKEY_CONTEXT,
    },
    SiteProfile {
        id: "rs-online-de",
        domains: &["de.rs-online.com"],
        search_template: "https://de.rs-online.com/web/c/?searchTerm={term}",
        link_selectors: RS_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: RS_CONTEXT,
    },
    SiteProfile {
        id: "rs-online",
        domains: &["rs-online.com"],
        search_template: "https://uk.rs-online.com/web/c/?searchTerm={term}",
        link_selectors: RS_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: RS_CONTEXT,
    },
    SiteProfile {
        id: "mouser",
        domains: &["mouser."],
        search_template: "{origin}/c/?q={term}",
        link_selectors: MOUSER_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: "Mouser electronics - components with detailed specifications and pricing tiers",
    },
    SiteProfile {
        id: "radwell",
        domains: &["radwell."],
        search_template: "{origin}/shop?q={term}",
        link_selectors: GENERIC_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: "Industrial automation parts - focus on part numbers, condition codes, warranty",
    },
    SiteProfile {
        id: "farnell",
        domains: &["farnell."],
        search_template: "{origin}/search?st={term}",
        link_selectors: GENERIC_LINK_SELECTORS,
        detail_selectors: PRODUCT_DETAIL_SELECTORS,
        context: "Farnell electronics distributor - industrial components with technical data",
    },
];

pub static GENERIC: SiteProfile = SiteProfile {
    id: "generic",
    domains: &[],
    search_template: "{site}/search?q={term}",
    link_selectors: GENERIC_LINK_SELECTORS,
    detail_selectors: PRODUCT_DETAIL_SELECTORS,
    context: GENERIC_CONTEXT,
};

/// Profile for `site_url`, falling back to [`GENERIC`].
///
/// ```
/// use partscout_scrape::sites::resolve;
///
/// assert_eq!(resolve("https://www.ebay.de/").id, "ebay-de");
/// assert_eq!(resolve("https://WWW.DIGIKEY.COM").id, "digikey");
/// assert_eq!(resolve("https://shop.example.org").id, "generic");
/// ```
pub fn resolve(site_url: &str) -> &'static SiteProfile {
    let host = site_host(site_url);
    PROFILES
        .iter()
        .find(|p| p.matches(&host))
        .unwrap_or(&GENERIC)
}

/// Prompt hint for `site_url`.
pub fn search_context(site_url: &str) -> &'static str {
    resolve(site_url).context
}

/// Lowercased host, tolerating inputs without a scheme.
fn site_host(site_url: &str) -> String {
    let trimmed = site_url.trim();
    Url::parse(trimmed)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{trimmed}")).ok())
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| trimmed.to_ascii_lowercase())
}

fn site_origin(site_url: &str) -> String {
    match Url::parse(site_url.trim()) {
        Ok(u) if u.host_str().is_some() => u.origin().ascii_serialization(),
        _ => site_url.trim().trim_end_matches('/').to_string(),
    }
}

/// Product links on a rendered search page, in document order.
///
/// Root-relative hrefs are resolved against `site_url`; anything that is not
/// then an absolute http(s) URL is dropped. Fragments are stripped before
/// de-duplication and the result is capped at `cap`.
pub fn discover_candidates(
    html: &str,
    site_url: &str,
    profile: &SiteProfile,
    cap: usize,
) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(site_url.trim()).ok();

    for raw_selector in profile.link_selectors {
        let selector = match Selector::parse(raw_selector) {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!(target: "scrape.search", selector = %raw_selector, "invalid link selector");
                continue;
            }
        };

        let mut seen = HashSet::new();
        let links: Vec<String> = document
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| absolute_link(href.trim(), base.as_ref()))
            .filter(|link| seen.insert(link.clone()))
            .take(cap)
            .collect();

        if !links.is_empty() {
            tracing::debug!(
                target: "scrape.search",
                selector = %raw_selector,
                count = links.len(),
                "link selector matched"
            );
            return links;
        }
    }
    Vec::new()
}

fn absolute_link(href: &str, base: Option<&Url>) -> Option<String> {
    let mut url = if href.starts_with('/') {
        base?.join(href).ok()?
    } else {
        let lower = href.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return None;
        }
        Url::parse(href).ok()?
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_variants_win_over_bare_brand() {
        assert_eq!(resolve("https://www.ebay.de").id, "ebay-de");
        assert_eq!(resolve("https://www.ebay.com").id, "ebay-com");
        assert_eq!(resolve("https://www.ebay.co.uk").id, "ebay");
        assert_eq!(resolve("https://www.digikey.de").id, "digikey-de");
        assert_eq!(resolve("https://www.digikey.com").id, "digikey");
        assert_eq!(resolve("https://de.rs-online.com").id, "rs-online-de");
        assert_eq!(resolve("https://uk.rs-online.com").id, "rs-online");
        assert_eq!(resolve("https://www.mouser.com").id, "mouser");
        assert_eq!(resolve("https://www.radwell.com").id, "radwell");
        assert_eq!(resolve("https://uk.farnell.com").id, "farnell");
    }

    #[test]
    fn resolution_is_deterministic_and_never_fails() {
        for input in ["", "not a url", "https://shop.example.org", "ebay.com"] {
            assert_eq!(resolve(input), resolve(input));
        }
        assert_eq!(resolve("ebay.com").id, "ebay-com");
        assert_eq!(resolve("not a url").id, "generic");
        assert_eq!(search_context("https://shop.example.org"), GENERIC_CONTEXT);
        assert!(search_context("https://www.ebay.com").starts_with("eBay"));
    }

    #[test]
    fn builds_encoded_search_urls() {
        let ebay = resolve("https://www.ebay.com");
        assert_eq!(
            ebay.search_url("https://www.ebay.com", "ARDUINO UNO"),
            "https://www.ebay.com/sch/i.html?_nkw=ARDUINO%20UNO"
        );
        let mouser = resolve("https://www.mouser.de/");
        assert_eq!(
            mouser.search_url("https://www.mouser.de/", "LM358 op-amp"),
            "https://www.mouser.de/c/?q=LM358%20op-amp"
        );
        assert_eq!(
            GENERIC.search_url("https://shop.example.org/", "a&b"),
            "https://shop.example.org/search?q=a%26b"
        );
    }

    #[test]
    fn generic_search_keeps_the_submitted_path() {
        assert_eq!(
            GENERIC.search_url("https://shop.example.org/de", "relay 24V"),
            "https://shop.example.org/de/search?q=relay%2024V"
        );
        assert_eq!(
            GENERIC.search_url(" https://shop.example.org/de/ ", "relay"),
            "https://shop.example.org/de/search?q=relay"
        );
        // brand templates only ever use the host
        let radwell = resolve("https://www.radwell.com/en-US/");
        assert_eq!(
            radwell.search_url("https://www.radwell.com/en-US/", "6ES7"),
            "https://www.radwell.com/shop?q=6ES7"
        );
    }

    #[test]
    fn first_non_empty_selector_set_wins() {
        let html = r##"
            <a class="s-item__link" href="https://www.ebay.com/other/1">x</a>
            <a href="/itm/111?hash=abc#details">one</a>
            <a href="https://www.ebay.com/itm/222">two</a>
            <a href="/itm/111?hash=abc">dup</a>
            <a href="javascript:void(0)">js</a>
            <a href="itm/333">relative</a>
        "##;
        let profile = resolve("https://www.ebay.com");
        let links = discover_candidates(html, "https://www.ebay.com", profile, 10);
        assert_eq!(
            links,
            vec![
                "https://www.ebay.com/itm/111?hash=abc".to_string(),
                "https://www.ebay.com/itm/222".to_string(),
            ]
        );
    }

    #[test]
    fn falls_through_to_later_sets_and_caps() {
        let anchors: String = (0..15)
            .map(|i| format!(r#"<a class="product-link" href="https://shop.example.org/x/{i}">p</a>"#))
            .collect();
        let links = discover_candidates(&anchors, "https://shop.example.org", &GENERIC, 10);
        assert_eq!(links.len(), 10);
        assert_eq!(links[0], "https://shop.example.org/x/0");
        assert!(discover_candidates("<p>none</p>", "https://shop.example.org", &GENERIC, 10).is_empty());
    }
}
