//! Page templates of the car-review site: the selectors each stage queries and
//! the URL conventions linking the ratings and technical-data pages.

use anyhow::Result;

use crate::error::ScrapeError;
use crate::markup::Query;

// ── Link discovery ──

pub const MAKE: Query = Query::new("a", &["make"]);
pub const MODEL: Query = Query::new(
    "a",
    &[
        "photo-loader big-box",
        "photo-loader big-box other-model not-activated",
    ],
);
/// Generation tiles on a model page, variant tiles on a technical-data page.
pub const CAR_SELECTOR: Query = Query::new("a", &["car-selector-box"]);

// ── Ratings ──

pub const RATING_VALUES: Query = Query::new(
    "div",
    &["value", "rate-box-container", "other-offers__text__price"],
);

// ── Technical data ──

pub const ENGINE: Query = Query::new(
    "a",
    &[
        "engine-link pb",
        "engine-link on",
        "engine-link el",
        "engine-link hyb",
        "engine-link plugin",
    ],
);
pub const PARAM_VALUE: Query = Query::new("span", &["dt-param-value"]);
pub const PARAM_LABEL: Query = Query::new("div", &["dt-row__text__content"]);

/// Model identifier: path after `<marker>/`, slashes turned into spaces.
pub fn identifier_after(url: &str, marker: &str) -> Result<String> {
    let needle = format!("{}/", marker);
    let (_, rest) = url.split_once(&needle).ok_or_else(|| ScrapeError::MissingSegment {
        url: url.to_string(),
        marker: needle.clone(),
    })?;
    Ok(rest.replace('/', " ").trim().to_string())
}

/// Rewrites every link, e.g. ratings pages into technical-data pages.
pub fn modify_urls(links: &[String], old: &str, new: &str) -> Vec<String> {
    links.iter().map(|link| link.replace(old, new)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RATINGS_SEGMENT, TECH_SPECS_SEGMENT};

    #[test]
    fn identifier_from_ratings_url() {
        let id = identifier_after(
            "https://www.autocentrum.pl/oceny/audi/a4/b8/",
            RATINGS_SEGMENT,
        )
        .unwrap();
        assert_eq!(id, "audi a4 b8");
    }

    #[test]
    fn identifier_requires_marker() {
        let err = identifier_after("https://www.autocentrum.pl/audi/", TECH_SPECS_SEGMENT)
            .unwrap_err();
        assert!(err.to_string().contains("dane-techniczne/"));
    }

    #[test]
    fn ratings_links_become_tech_spec_links() {
        let links = vec![
            "https://www.autocentrum.pl/oceny/audi/a4/b8/".to_string(),
            "https://www.autocentrum.pl/oceny/bmw/seria-3/e90/".to_string(),
        ];
        let out = modify_urls(&links, RATINGS_SEGMENT, TECH_SPECS_SEGMENT);
        assert_eq!(
            out,
            [
                "https://www.autocentrum.pl/dane-techniczne/audi/a4/b8/",
                "https://www.autocentrum.pl/dane-techniczne/bmw/seria-3/e90/",
            ]
        );
    }
}
