use std::path::PathBuf;

use anyhow::{Context, Result};
use ::config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://www.autocentrum.pl";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36";

/// Records held in memory before the tech-spec writer moves on to a new file.
pub const DEFAULT_ROLLOVER_THRESHOLD: usize = 1500;

/// Path segment marking a ratings page (`/oceny/<make>/<model>/...`).
pub const RATINGS_SEGMENT: &str = "oceny";
/// Path segment marking a technical-data page.
pub const TECH_SPECS_SEGMENT: &str = "dane-techniczne";

const ENV_PREFIX: &str = "CARS";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub links_file: String,
    pub ratings_file: String,
    pub specs_dir: String,
    pub specs_name: String,
    pub error_log: String,
    pub rollover_threshold: usize,
    pub db_path: PathBuf,
}

impl Settings {
    /// Compiled-in defaults overlaid with `CARS_*` environment variables.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("data_dir", "data")?
            .set_default("links_file", "car_model_links.txt")?
            .set_default("ratings_file", "car_ratings.txt")?
            .set_default("specs_dir", "car_technical_data")?
            .set_default("specs_name", "car_technical_data")?
            .set_default("error_log", "scraping_errors_log.txt")?
            .set_default("rollover_threshold", DEFAULT_ROLLOVER_THRESHOLD as i64)?
            .set_default("db_path", "cars.db")?
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize()
            .context("Invalid configuration value")
    }

    pub fn links_path(&self) -> PathBuf {
        self.data_dir.join(&self.links_file)
    }

    pub fn ratings_path(&self) -> PathBuf {
        self.data_dir.join(&self.ratings_file)
    }

    pub fn specs_path(&self) -> PathBuf {
        self.data_dir.join(&self.specs_dir)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.specs_path().join(&self.error_log)
    }
}
