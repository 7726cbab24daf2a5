use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::TECH_SPECS_SEGMENT;
use crate::fetch::Fetch;
use crate::markup::Markup;
use crate::site;

static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{a0} ](?:l/100km|km/h|cm³|mm|km|kg|l|s)$").unwrap()
});

pub const MODEL_KEY: &str = "Model";

/// Which variants' engine lists feed the per-engine pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineScope {
    /// Every variant page is fetched, only the last one's engines are kept.
    #[default]
    LastVariant,
    /// Engines of all variants, in variant then document order.
    AllVariants,
}

/// Label → value pairs for one engine of one generation. Key order is page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechSpecRecord(Map<String, Value>);

impl TechSpecRecord {
    /// Pair labels with values by position, then drop pairs with empty values.
    /// Whichever side is longer loses its tail.
    pub fn from_pairs<L, V>(labels: L, values: V) -> Self
    where
        L: IntoIterator<Item = String>,
        V: IntoIterator<Item = String>,
    {
        let mut map: Map<String, Value> = labels
            .into_iter()
            .zip(values)
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        map.retain(|_, v| !is_blank(v));
        Self(map)
    }

    pub fn model(&self) -> Option<&str> {
        self.get(MODEL_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every pair with the value rendered as text.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, String)> {
        self.0.iter().map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.as_str(), text)
        })
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Drop one trailing unit (mm, l, cm³, km/h, s, l/100km, km, kg).
pub fn strip_unit(value: &str) -> String {
    UNIT_RE.replace(value, "").into_owned()
}

/// Records for every engine of the generation behind `url` (a technical-data page).
pub async fn scrape_car_tech_specs<F, M>(
    fetcher: &F,
    markup: &M,
    base: &Url,
    url: &str,
    scope: EngineScope,
) -> Result<Vec<TechSpecRecord>>
where
    F: Fetch,
    M: Markup,
{
    let html = fetcher.fetch(url).await?;
    let variants = markup
        .select(&html, &site::CAR_SELECTOR)?
        .iter()
        .map(|v| v.absolute_href(base, url))
        .collect::<Result<Vec<_>>>()?;

    let engines = if variants.is_empty() {
        engine_links(markup, base, url, &html)?
    } else {
        let mut engines = Vec::new();
        for variant in &variants {
            let html = fetcher.fetch(variant).await?;
            let found = engine_links(markup, base, variant, &html)?;
            match scope {
                EngineScope::LastVariant => engines = found,
                EngineScope::AllVariants => engines.extend(found),
            }
        }
        engines
    };
    debug!("{}: {} variants, {} engines", url, variants.len().max(1), engines.len());

    let mut records = Vec::with_capacity(engines.len());
    for engine in &engines {
        records.push(scrape_engine(fetcher, markup, engine).await?);
    }
    Ok(records)
}

fn engine_links<M: Markup>(markup: &M, base: &Url, page: &str, html: &str) -> Result<Vec<String>> {
    markup
        .select(html, &site::ENGINE)?
        .iter()
        .map(|e| e.absolute_href(base, page))
        .collect()
}

async fn scrape_engine<F, M>(fetcher: &F, markup: &M, url: &str) -> Result<TechSpecRecord>
where
    F: Fetch,
    M: Markup,
{
    let model = site::identifier_after(url, TECH_SPECS_SEGMENT)?;
    let html = fetcher.fetch(url).await?;

    let labels = std::iter::once(MODEL_KEY.to_string()).chain(
        markup
            .select(&html, &site::PARAM_LABEL)?
            .into_iter()
            .map(|n| n.stripped_text()),
    );
    let values = std::iter::once(model).chain(
        markup
            .select(&html, &site::PARAM_VALUE)?
            .into_iter()
            .map(|n| strip_unit(&n.stripped_text())),
    );

    Ok(TechSpecRecord::from_pairs(labels, values))
}
