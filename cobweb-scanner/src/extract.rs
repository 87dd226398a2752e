use scraper::{Html, Selector};

const VOID_PLACEHOLDER: &str = "javascript:void(0)";

/// Pulls the raw link-bearing attribute values out of a decoded document.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, document: &str) -> Vec<String>;
}

/// Extracts every `src` value, then every `href` value, each in document order.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    src: Selector,
    href: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self {
            src: Selector::parse("[src]").expect("static selector"),
            href: Selector::parse("[href]").expect("static selector"),
        }
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, document: &str) -> Vec<String> {
        let document = Html::parse_document(document);

        let srcs = document
            .select(&self.src)
            .filter_map(|element| element.value().attr("src"));
        let hrefs = document
            .select(&self.href)
            .filter_map(|element| element.value().attr("href"));

        srcs.chain(hrefs)
            .filter(|value| !value.contains(VOID_PLACEHOLDER))
            .map(str::to_string)
            .collect()
    }
}
