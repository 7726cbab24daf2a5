mod batch;
mod config;
mod db;
mod error;
mod extract;
mod fetch;
mod links;
mod markup;
mod progress;
mod site;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use url::Url;

use crate::batch::TechSpecJob;
use crate::config::{Settings, RATINGS_SEGMENT, TECH_SPECS_SEGMENT};
use crate::extract::EngineScope;
use crate::fetch::HttpFetcher;
use crate::markup::HtmlMarkup;

#[derive(Parser)]
#[command(name = "autocentrum_scraper", about = "Car ratings and technical data scraper")]
struct Cli {
    /// Output directory (overrides CARS_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover generation pages and write the links file
    Links,
    /// Append one ratings row per link
    Ratings {
        /// Skip the first N links
        #[arg(long, default_value = "0")]
        skip: usize,
        /// Max links to scrape (default or 0: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape technical data per engine into rolling JSON files
    Specs {
        /// Skip the first N links
        #[arg(long, default_value = "0")]
        skip: usize,
        /// Max links to scrape (default or 0: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Collect engines from every variant, not only the last one
        #[arg(long)]
        all_variants: bool,
    },
    /// Links, ratings and technical data in one go
    Run {
        /// Max links per scraping stage
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        all_variants: bool,
    },
    /// Load the ratings file and technical-data files into SQLite
    Import,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let result = match cli.command {
        Commands::Links => run_links(&settings).await,
        Commands::Ratings { skip, limit } => run_ratings(&settings, skip, limit).await,
        Commands::Specs {
            skip,
            limit,
            all_variants,
        } => run_specs(&settings, skip, limit, scope(all_variants)).await,
        Commands::Run {
            limit,
            all_variants,
        } => {
            run_links(&settings).await?;
            run_ratings(&settings, 0, limit).await?;
            run_specs(&settings, 0, limit, scope(all_variants)).await
        }
        Commands::Import => run_import(&settings),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn scope(all_variants: bool) -> EngineScope {
    if all_variants {
        EngineScope::AllVariants
    } else {
        EngineScope::LastVariant
    }
}

async fn run_links(settings: &Settings) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(settings)?;
    let base = Url::parse(&settings.base_url)?;
    let found = links::discover_links(&fetcher, &HtmlMarkup, &base).await?;
    let path = settings.links_path();
    store::save_links(&path, &found)?;
    println!("Total links scraped: {} (saved to {})", found.len(), path.display());
    Ok(())
}

async fn run_ratings(settings: &Settings, skip: usize, limit: Option<usize>) -> anyhow::Result<()> {
    let all = store::load_links(&settings.links_path())?;
    let todo = all.get(skip..).unwrap_or(&[]);
    if todo.is_empty() {
        println!("No links to scrape. Run 'links' first.");
        return Ok(());
    }

    let fetcher = HttpFetcher::new(settings)?;
    let path = settings.ratings_path();
    println!("Scraping ratings for {} links...", batch::capped(todo, limit).len());
    batch::scrape_and_save_ratings(&fetcher, &HtmlMarkup, &path, todo, limit).await?;
    Ok(())
}

async fn run_specs(
    settings: &Settings,
    skip: usize,
    limit: Option<usize>,
    scope: EngineScope,
) -> anyhow::Result<()> {
    let all = store::load_links(&settings.links_path())?;
    let all = site::modify_urls(&all, RATINGS_SEGMENT, TECH_SPECS_SEGMENT);
    let todo = all.get(skip..).unwrap_or(&[]);
    if todo.is_empty() {
        println!("No links to scrape. Run 'links' first.");
        return Ok(());
    }

    let fetcher = HttpFetcher::new(settings)?;
    let base = Url::parse(&settings.base_url)?;
    let job = TechSpecJob {
        dir: settings.specs_path(),
        name: settings.specs_name.clone(),
        error_log: settings.error_log_path(),
        rollover_threshold: settings.rollover_threshold,
        scope,
    };
    println!("Scraping technical data for {} links...", batch::capped(todo, limit).len());
    batch::scrape_and_save_tech_data(&fetcher, &HtmlMarkup, &base, &job, todo, limit).await?;
    Ok(())
}

fn run_import(settings: &Settings) -> anyhow::Result<()> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let ratings = settings.ratings_path();
    if ratings.exists() {
        let rows = store::load_rating_rows(&ratings)?;
        let n = db::insert_ratings(&conn, &rows)?;
        println!("Inserted {} records into ratings table.", n);
    } else {
        println!("No ratings file at {}", ratings.display());
    }

    let files = store::existing_spec_files(&settings.specs_path(), &settings.specs_name);
    if files.is_empty() {
        println!("No technical data files in {}", settings.specs_path().display());
    }
    for path in files {
        let records = store::load_spec_records(&path)?;
        let source = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let n = db::insert_tech_specs(&conn, &source, &records)?;
        println!("Inserted {} records into tech_specs table ({}).", n, source);
    }

    println!(
        "Database {}: {} ratings, {} tech spec values",
        settings.db_path.display(),
        db::count_rows(&conn, "ratings")?,
        db::count_rows(&conn, "tech_specs")?
    );
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
