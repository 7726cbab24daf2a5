use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::extract::{scrape_car_ratings, scrape_car_tech_specs, EngineScope};
use crate::fetch::Fetch;
use crate::markup::Markup;
use crate::progress;
use crate::store::{ErrorLog, RatingsWriter, TechSpecFile};

/// First `limit` links, or all of them when the limit is unset or zero.
pub fn capped(links: &[String], limit: Option<usize>) -> &[String] {
    match limit {
        Some(n) if n > 0 => &links[..n.min(links.len())],
        _ => links,
    }
}

// ── Ratings ──

#[derive(Debug)]
pub struct RatingStats {
    pub links: usize,
    pub written: usize,
}

/// Append one rating row per link to `path`. The first failing link aborts
/// the batch; rows written before it stay in the file.
pub async fn scrape_and_save_ratings<F, M>(
    fetcher: &F,
    markup: &M,
    path: &Path,
    links: &[String],
    limit: Option<usize>,
) -> Result<RatingStats>
where
    F: Fetch,
    M: Markup,
{
    let links = capped(links, limit);
    let mut writer = RatingsWriter::open_append(path)?;
    let pb = progress::bar(links.len());
    let mut stats = RatingStats {
        links: links.len(),
        written: 0,
    };

    for link in links {
        let record = scrape_car_ratings(fetcher, markup, link)
            .await
            .with_context(|| format!("Rating batch stopped at {}", link))?;
        writer.write(&record)?;
        stats.written += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Scraped data for {} cars and saved to {}", stats.written, path.display());
    Ok(stats)
}

// ── Technical data ──

/// Where and how the technical-data batch persists its records.
pub struct TechSpecJob {
    pub dir: PathBuf,
    pub name: String,
    pub error_log: PathBuf,
    pub rollover_threshold: usize,
    pub scope: EngineScope,
}

pub struct TechSpecStats {
    pub links: usize,
    pub records: usize,
    pub errors: usize,
    pub files: usize,
}

/// Scrape every link, rewriting the current JSON file after each success.
/// Failing links are logged and skipped.
pub async fn scrape_and_save_tech_data<F, M>(
    fetcher: &F,
    markup: &M,
    base: &Url,
    job: &TechSpecJob,
    links: &[String],
    limit: Option<usize>,
) -> Result<TechSpecStats>
where
    F: Fetch,
    M: Markup,
{
    let links = capped(links, limit);
    let mut file = TechSpecFile::open(&job.dir, &job.name);
    if !file.is_empty() {
        info!("Resuming {} with {} records", file.path().display(), file.len());
    }
    let error_log = ErrorLog::new(job.error_log.clone());

    let pb = progress::bar(links.len());
    let mut stats = TechSpecStats {
        links: links.len(),
        records: 0,
        errors: 0,
        files: 1,
    };

    for link in links {
        if file.len() > job.rollover_threshold {
            file.roll_over();
            info!(
                "File exceeded {} entries, continuing in {}",
                job.rollover_threshold,
                file.path().display()
            );
        }

        match scrape_car_tech_specs(fetcher, markup, base, link, job.scope).await {
            Ok(records) => {
                stats.records += records.len();
                file.extend(records);
                file.save()?;
            }
            Err(e) => {
                warn!("Error scraping {}: {:#}", link, e);
                error_log.record(link, &e)?;
                stats.errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    stats.files = file.number();
    info!(
        "Scraped and saved {} car specs to {} files ({} of {} links failed, see {})",
        stats.records,
        stats.files,
        stats.errors,
        stats.links,
        job.error_log.display()
    );
    Ok(stats)
}
