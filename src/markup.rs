use anyhow::Result;
use scraper::{Html, Selector};
use url::Url;

use crate::error::ScrapeError;

/// Tag plus a set of alternative class specs. A spec containing spaces must
/// match the element's whole `class` attribute; a single word matches any
/// element carrying that class.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub tag: &'static str,
    pub classes: &'static [&'static str],
}

impl Query {
    pub const fn new(tag: &'static str, classes: &'static [&'static str]) -> Self {
        Self { tag, classes }
    }

    pub fn to_css(&self) -> String {
        self.classes
            .iter()
            .map(|class| {
                if class.contains(' ') {
                    format!("{}[class=\"{}\"]", self.tag, class)
                } else {
                    format!("{}.{}", self.tag, class)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One matched element.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Descendant text nodes, document order, untouched.
    pub fragments: Vec<String>,
    pub href: Option<String>,
}

impl Node {
    /// Concatenated text content.
    pub fn text(&self) -> String {
        self.fragments.concat()
    }

    /// Concatenated text content with every text node trimmed.
    pub fn stripped_text(&self) -> String {
        self.fragments.iter().map(|f| f.trim()).collect()
    }

    /// `href` resolved against `base`.
    pub fn absolute_href(&self, base: &Url, page: &str) -> Result<String> {
        let href = self
            .href
            .as_deref()
            .ok_or_else(|| ScrapeError::MissingHref(page.to_string()))?;
        Ok(base.join(href)?.to_string())
    }
}

/// Markup-query capability: raw page + query in, matches in document order out.
pub trait Markup {
    fn select(&self, html: &str, query: &Query) -> Result<Vec<Node>>;
}

/// `scraper`-backed implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMarkup;

impl Markup for HtmlMarkup {
    fn select(&self, html: &str, query: &Query) -> Result<Vec<Node>> {
        let css = query.to_css();
        let selector =
            Selector::parse(&css).map_err(|e| ScrapeError::Selector(format!("{}: {:?}", css, e)))?;
        let doc = Html::parse_document(html);

        Ok(doc
            .select(&selector)
            .map(|el| Node {
                fragments: el.text().map(str::to_string).collect(),
                href: el.value().attr("href").map(str::to_string),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINES: Query = Query::new("a", &["engine-link pb", "engine-link on"]);
    const VALUES: Query = Query::new("div", &["value", "rate-box-container"]);

    #[test]
    fn multi_word_class_matches_whole_attribute() {
        assert_eq!(
            ENGINES.to_css(),
            r#"a[class="engine-link pb"], a[class="engine-link on"]"#
        );
        let html = r#"
            <a class="engine-link on" href="/x">x</a>
            <a class="engine-link pb extra" href="/y">y</a>
            <a class="engine-link pb" href="/z">z</a>"#;
        let nodes = HtmlMarkup.select(html, &ENGINES).unwrap();
        let hrefs: Vec<_> = nodes.iter().filter_map(|n| n.href.as_deref()).collect();
        assert_eq!(hrefs, ["/x", "/z"]);
    }

    #[test]
    fn union_keeps_document_order() {
        let html = r#"
            <div class="rate-box-container">a</div>
            <div class="value big">b</div>
            <div class="rate-box-container">c</div>"#;
        let texts: Vec<_> = HtmlMarkup
            .select(html, &VALUES)
            .unwrap()
            .iter()
            .map(Node::text)
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn stripped_text_trims_each_fragment() {
        let html = "<div class=\"value\">  4,5 <span> / 5 </span>\n</div>";
        let node = &HtmlMarkup.select(html, &VALUES).unwrap()[0];
        assert_eq!(node.text(), "  4,5  / 5 \n");
        assert_eq!(node.stripped_text(), "4,5/ 5");
    }

    #[test]
    fn absolute_href_joins_relative_paths() {
        let base = Url::parse("https://www.autocentrum.pl").unwrap();
        let node = Node {
            fragments: vec![],
            href: Some("/oceny/audi/".into()),
        };
        assert_eq!(
            node.absolute_href(&base, "root").unwrap(),
            "https://www.autocentrum.pl/oceny/audi/"
        );
        let bare = Node { fragments: vec![], href: None };
        assert!(bare.absolute_href(&base, "root").is_err());
    }
}
