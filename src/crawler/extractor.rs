//! Link extraction from decoded markup
//!
//! Two extractors sit behind [`LinkExtractor`]:
//!
//! - [`PatternExtractor`] scans the text for `href="..."` and `href='...'`.
//!   It does not understand HTML structure: it also finds hrefs inside scripts
//!   and comments, misses values split across lines, and leaves entities
//!   (`&amp;`) undecoded.
//! - [`HtmlExtractor`] parses the document with `scraper` and reads the `href`
//!   attribute of every element that has one.
//!
//! Both yield raw values in document order without deduplication; the visited
//! registry takes care of repeats.

use crate::config::ExtractorKind;
use regex::Regex;
use scraper::{Html, Selector};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

const HREF_PATTERN: &str = r#"href="([^"\n]+)"|href='([^'\n]+)'"#;

/// Produces the raw href values found in a markup document
pub trait LinkExtractor: Send + Sync {
    fn extract<'a>(&'a self, markup: &'a str) -> Box<dyn Iterator<Item = Cow<'a, str>> + 'a>;
}

/// Builds the extractor selected in the configuration
pub fn build_extractor(kind: ExtractorKind) -> Arc<dyn LinkExtractor> {
    match kind {
        ExtractorKind::Pattern => Arc::new(PatternExtractor::new()),
        ExtractorKind::Html => Arc::new(HtmlExtractor),
    }
}

/// Textual href scanner; matches lazily as the iterator is consumed
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    pattern: &'static Regex,
}

impl PatternExtractor {
    pub fn new() -> Self {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern =
            PATTERN.get_or_init(|| Regex::new(HREF_PATTERN).expect("href pattern is valid"));
        Self { pattern }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for PatternExtractor {
    fn extract<'a>(&'a self, markup: &'a str) -> Box<dyn Iterator<Item = Cow<'a, str>> + 'a> {
        Box::new(
            self.pattern
                .captures_iter(markup)
                .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|m| Cow::Borrowed(m.as_str())),
        )
    }
}

/// Structural extractor backed by an HTML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl LinkExtractor for HtmlExtractor {
    fn extract<'a>(&'a self, markup: &'a str) -> Box<dyn Iterator<Item = Cow<'a, str>> + 'a> {
        let Ok(selector) = Selector::parse("[href]") else {
            return Box::new(std::iter::empty());
        };

        // The parsed document is not Send, so values are collected before returning
        let document = Html::parse_document(markup);
        let hrefs: Vec<String> = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(str::to_string)
            .collect();

        Box::new(hrefs.into_iter().map(Cow::Owned))
    }
}
