//! Rendered HTML to bounded, de-noised text.

use crate::sites;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fmt;

/// Upper bound on whitespace-separated tokens handed to the model.
pub const MAX_TOKENS: usize = 1000;

/// Sentence units this short (in chars) or shorter are dropped.
const MIN_UNIT_CHARS: usize = 10;

const DENYLIST: &[&str] = &[
    "script",
    "style",
    "noscript",
    "nav",
    "footer",
    "header",
    ".advertisement",
    ".ads",
    ".cookie-banner",
    ".newsletter",
    ".social-media",
    ".breadcrumb",
];

const MAIN_SELECTORS: &[&str] = &["main", ".main-content", "#main", ".content"];

const NOISE_PATTERNS: &[&str] = &[
    r"(?i)cookie\s+policy",
    r"(?i)privacy\s+policy",
    r"(?i)terms\s+of\s+service",
    r"(?i)newsletter\s+signup",
    r"(?i)follow\s+us",
    r"(?i)social\s+media",
    r"(?i)customer\s+reviews\s+powered\s+by",
    r"(?i)advertisement",
    r"(?i)sponsored\s+content",
];

/// Whitespace-collapsed text with no repeated sentence units and at most
/// [`MAX_TOKENS`] tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compiled selectors and noise patterns, built once and reused per page.
pub struct ContentNormalizer {
    denylist: Vec<Selector>,
    main: Vec<Selector>,
    body: Option<Selector>,
    noise: Vec<Regex>,
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentNormalizer {
    pub fn new() -> Self {
        Self {
            denylist: parse_selectors(DENYLIST),
            main: parse_selectors(MAIN_SELECTORS),
            body: Selector::parse("body").ok(),
            noise: NOISE_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }

    /// Distil `html` rendered from `source_url`.
    ///
    /// ```
    /// use partscout_scrape::ContentNormalizer;
    ///
    /// let html = r#"<html><body>
    ///   <nav>Home / Shop</nav>
    ///   <div class="product-details">Arduino Uno Rev3 development board. In stock now</div>
    ///   <footer>Privacy policy and more footer text</footer>
    /// </body></html>"#;
    /// let text = ContentNormalizer::new().normalize(html, "https://shop.example.org/p/1");
    /// assert_eq!(text.as_str(), "Arduino Uno Rev3 development board. In stock now");
    /// ```
    pub fn normalize(&self, html: &str, source_url: &str) -> NormalizedText {
        let mut document = Html::parse_document(html);
        self.strip_denylisted(&mut document);

        let profile = sites::resolve(source_url);
        let raw = self.select_content(&document, profile.detail_selectors);
        let text = self.clean(&raw);

        tracing::debug!(
            target: "scrape.normalize",
            url = %source_url,
            raw_chars = raw.len(),
            tokens = text.token_count(),
            "normalized page"
        );
        text
    }

    fn strip_denylisted(&self, document: &mut Html) {
        let root = document.root_element();
        let mut doomed: Vec<_> = self
            .denylist
            .iter()
            .flat_map(|sel| root.select(sel).map(|el| el.id()))
            .collect();
        doomed.extend(
            document
                .tree
                .nodes()
                .filter(|node| node.value().is_comment())
                .map(|node| node.id()),
        );

        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// Detail selectors first (all matches of the first selector that
    /// matches), then the first generic main container, then body.
    fn select_content(&self, document: &Html, detail_selectors: &[&str]) -> String {
        // Detached subtrees stay in the arena, so always walk from the root.
        let root = document.root_element();

        for raw in detail_selectors {
            let Ok(selector) = Selector::parse(raw) else {
                continue;
            };
            let parts: Vec<String> = root.select(&selector).map(element_text).collect();
            if !parts.is_empty() {
                return parts.join(" ");
            }
        }

        for selector in &self.main {
            if let Some(el) = root.select(selector).next() {
                return element_text(el);
            }
        }

        self.body
            .as_ref()
            .and_then(|sel| root.select(sel).next())
            .map(element_text)
            .unwrap_or_else(|| element_text(root))
    }

    fn clean(&self, raw: &str) -> NormalizedText {
        let mut text = raw.to_string();
        for pattern in &self.noise {
            text = pattern.replace_all(&text, "").into_owned();
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut seen = HashSet::new();
        let units: Vec<&str> = collapsed
            .split('.')
            .map(str::trim)
            .filter(|unit| unit.chars().count() > MIN_UNIT_CHARS)
            .filter(|unit| seen.insert(*unit))
            .collect();
        let deduped = units.join(". ");

        let bounded = deduped
            .split_whitespace()
            .take(MAX_TOKENS)
            .collect::<Vec<_>>()
            .join(" ");
        NormalizedText(bounded)
    }
}

fn parse_selectors(raw: &[&str]) -> Vec<Selector> {
    raw.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

/// Text nodes trimmed and joined by single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(html: &str) -> NormalizedText {
        ContentNormalizer::new().normalize(html, "https://shop.example.org/p/1")
    }

    #[test]
    fn removes_denylisted_subtrees_and_comments() {
        let html = r#"<html><head><style>.x{color:red}</style></head><body>
            <header>Site header banner text</header>
            <script>var tracking = "should never appear";</script>
            <!-- hidden comment with plenty of words -->
            <div class="cookie-banner">We use cookies on this website</div>
            <p>Industrial servo drive with encoder feedback</p>
            <div class="ads"><p>Buy other things somewhere else</p></div>
        </body></html>"#;
        let text = normalize(html);
        assert_eq!(text.as_str(), "Industrial servo drive with encoder feedback");
    }

    #[test]
    fn detail_selectors_take_priority_and_concatenate() {
        let html = r#"<html><body>
            <main>Main area text that should be ignored here</main>
            <div class="product-info">First info block for the part</div>
            <div class="product-info">Second info block for the part</div>
            <div class="item-details">Item details are a lower priority selector</div>
        </body></html>"#;
        let text = normalize(html);
        assert_eq!(
            text.as_str(),
            "First info block for the part Second info block for the part"
        );
    }

    #[test]
    fn main_fallback_uses_first_match_only() {
        let html = r#"<html><body>
            <div class="content">First content container text</div>
            <div class="content">Second content container text</div>
            <p>Body-only paragraph outside containers</p>
        </body></html>"#;
        assert_eq!(normalize(html).as_str(), "First content container text");
    }

    #[test]
    fn strips_noise_phrases_case_insensitively() {
        let html = "<body><p>Read our COOKIE   Policy before buying the relay module today</p></body>";
        assert_eq!(
            normalize(html).as_str(),
            "Read our before buying the relay module today"
        );
    }

    #[test]
    fn drops_short_and_repeated_units() {
        let html = "<body><p>Ok. Ships from Germany. Brand new item in box. Ships from Germany. Tiny.</p></body>";
        assert_eq!(
            normalize(html).as_str(),
            "Ships from Germany. Brand new item in box"
        );
    }

    #[test]
    fn truncates_to_token_budget() {
        let words: String = (0..3_000).map(|i| format!("w{i} ")).collect();
        let html = format!("<body><p>{words}</p></body>");
        let text = normalize(&html);
        assert_eq!(text.token_count(), MAX_TOKENS);
        assert!(text.as_str().starts_with("w0 w1 w2"));
    }

    #[test]
    fn idempotent_on_clean_text() {
        let once = normalize(
            "<body><p>Stepper motor driver board. Supports microstepping up to 1/32. Stepper motor driver board.</p></body>",
        );
        let twice = normalize(&format!("<body><p>{once}</p></body>"));
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_or_garbage_input_yields_empty_text() {
        assert!(normalize("").is_empty());
        assert!(normalize("<<<>>>").is_empty());
        assert!(normalize("<html><body><script>x()</script></body></html>").is_empty());
    }
}
