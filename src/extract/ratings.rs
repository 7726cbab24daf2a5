use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::config::RATINGS_SEGMENT;
use crate::fetch::Fetch;
use crate::markup::Markup;
use crate::site;

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d,\d{1,2}|\d\d%").unwrap());
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\x{a0}|\s)(\d+)").unwrap());

/// Fields after the identifier: price, average, buy-again share, overall, 13 categories.
pub const BODY_LEN: usize = 17;
/// Body position of the buy-again share.
pub const BUY_AGAIN_INDEX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Price(i64),
    Score(f64),
}

impl Field {
    fn to_cell(self) -> String {
        match self {
            Field::Price(p) => p.to_string(),
            // Debug keeps the trailing ".0" on whole numbers
            Field::Score(s) => format!("{:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub model: String,
    pub fields: Vec<Option<Field>>,
}

impl RatingRecord {
    /// Identifier first, then every field; missing values become empty cells.
    pub fn to_row(&self) -> Vec<String> {
        std::iter::once(self.model.clone())
            .chain(
                self.fields
                    .iter()
                    .map(|f| f.map(Field::to_cell).unwrap_or_default()),
            )
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len() + 1
    }
}

/// Fetch one ratings page and extract its fixed-position rating vector.
pub async fn scrape_car_ratings<F, M>(fetcher: &F, markup: &M, url: &str) -> Result<RatingRecord>
where
    F: Fetch,
    M: Markup,
{
    let model = site::identifier_after(url, RATINGS_SEGMENT)?;
    let html = fetcher.fetch(url).await?;
    let texts: Vec<String> = markup
        .select(&html, &site::RATING_VALUES)?
        .iter()
        .map(|n| n.text())
        .collect();

    Ok(RatingRecord {
        model,
        fields: parse_rating_fields(&texts)?,
    })
}

/// Turn rating container texts (document order) into the 17-field body.
pub fn parse_rating_fields(texts: &[String]) -> Result<Vec<Option<Field>>> {
    let mut prices = Vec::new();
    let mut scores = Vec::new();
    let mut buy_again_seen = false;

    for text in texts {
        if let Some(caps) = PRICE_RE.captures(text) {
            let digits = format!("{}{}", &caps[1], &caps[2]);
            prices.push(Some(Field::Price(digits.parse()?)));
        }

        let Some(m) = SCORE_RE.find(text) else {
            continue;
        };
        match m.as_str().strip_suffix('%') {
            Some(pct) => {
                scores.push(Some(Field::Score(pct.parse::<f64>()? / 100.0)));
                buy_again_seen = true;
            }
            None => {
                scores.push(Some(Field::Score(m.as_str().replace(',', ".").parse()?)));
            }
        }
    }

    if prices.is_empty() {
        prices.push(None);
    }

    let mut fields = prices;
    fields.extend(scores);
    fields.truncate(BODY_LEN);

    if !buy_again_seen {
        let at = BUY_AGAIN_INDEX.min(fields.len());
        fields.insert(at, None);
    }
    fields.resize(BODY_LEN, None);

    Ok(fields)
}
