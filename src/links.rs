use anyhow::Result;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RATINGS_SEGMENT;
use crate::fetch::Fetch;
use crate::markup::{Markup, Node};
use crate::progress;
use crate::site;

/// Walk make listing → model pages → generation tiles and return every
/// generation page URL in discovery order. A model whose generation list
/// cannot be read contributes its own URL instead; a make whose page cannot
/// be read is skipped.
pub async fn discover_links<F, M>(fetcher: &F, markup: &M, base: &Url) -> Result<Vec<String>>
where
    F: Fetch,
    M: Markup,
{
    let root = base.join(&format!("/{}/", RATINGS_SEGMENT))?;
    info!("Fetching make listing: {}", root);
    let html = fetcher.fetch(root.as_str()).await?;
    let makes = markup.select(&html, &site::MAKE)?;
    info!("Makes found: {}", makes.len());

    let pb = progress::bar(makes.len());
    let mut links = Vec::new();

    for make in &makes {
        pb.set_message(make.stripped_text());
        let (make_url, model_urls) = match model_links(fetcher, markup, base, &root, make).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Skipping make {} ({:#})", make.stripped_text(), e);
                pb.inc(1);
                continue;
            }
        };
        debug!("{}: {} models", make_url, model_urls.len());

        for model_url in model_urls {
            match generation_links(fetcher, markup, base, &model_url).await {
                Ok(generations) => links.extend(generations),
                Err(e) => {
                    warn!("No generation list for {} ({}), keeping model link", model_url, e);
                    links.push(model_url);
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Generation links discovered: {}", links.len());
    Ok(links)
}

async fn model_links<F, M>(
    fetcher: &F,
    markup: &M,
    base: &Url,
    root: &Url,
    make: &Node,
) -> Result<(String, Vec<String>)>
where
    F: Fetch,
    M: Markup,
{
    let make_url = make.absolute_href(base, root.as_str())?;
    let html = fetcher.fetch(&make_url).await?;
    let models = markup
        .select(&html, &site::MODEL)?
        .iter()
        .map(|model| model.absolute_href(base, &make_url))
        .collect::<Result<Vec<_>>>()?;
    Ok((make_url, models))
}

async fn generation_links<F, M>(
    fetcher: &F,
    markup: &M,
    base: &Url,
    model_url: &str,
) -> Result<Vec<String>>
where
    F: Fetch,
    M: Markup,
{
    let html = fetcher.fetch(model_url).await?;
    markup
        .select(&html, &site::CAR_SELECTOR)?
        .iter()
        .map(|generation| generation.absolute_href(base, model_url))
        .collect()
}
