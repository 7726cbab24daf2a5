use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("no '{marker}' segment in {url}")]
    MissingSegment { url: String, marker: String },

    #[error("anchor without href on {0}")]
    MissingHref(String),

    #[error("invalid selector: {0}")]
    Selector(String),
}
