//! Ballot page retrieval and classification.

use async_trait::async_trait;
use chrono::Utc;
use scraper::Html;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::models::{BallotPage, Classification, PageKey};
use crate::parser::table::page_tables;
use crate::repository::RepositoryError;

/// Body marker for a precinct the site has nothing for yet.
pub const UNAVAILABLE_MARKER: &str = "not available at this time";

/// Body marker present whenever the site resolved the precinct.
pub const COUNTY_MARKER: &str = " County";

/// Body marker of a rendered sample ballot.
pub const BALLOT_MARKER: &str = "Sample Ballot";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    #[error("Invalid ballot URL: {0}")]
    InvalidUrl(String),
    #[error("Unexpected page content at {url}")]
    UnexpectedClassification { url: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Retrieves raw page bodies.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Build the ballot URL for a page from a template with `{election}` and
/// `{precinct}` placeholders.
pub fn ballot_url(template: &str, key: PageKey) -> Result<String, FetchError> {
    let url = template
        .replace("{election}", &key.election_id.to_string())
        .replace("{precinct}", &key.precinct_id.to_string());
    Url::parse(&url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    Ok(url)
}

/// Classify a page body. `None` means no known shape matched.
pub fn classify(body: &str) -> Option<Classification> {
    if body.contains(UNAVAILABLE_MARKER) || !body.contains(COUNTY_MARKER) {
        return Some(Classification::NoSignal);
    }
    if !body.contains(BALLOT_MARKER) {
        return None;
    }
    let document = Html::parse_document(body);
    Some(Classification::from_table_count(page_tables(&document).len()))
}

/// Fetches pages and applies classification to their state.
pub struct Fetcher<S> {
    source: S,
    url_template: String,
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S, url_template: impl Into<String>) -> Self {
        Self {
            source,
            url_template: url_template.into(),
        }
    }

    /// Fetch and reclassify a page.
    ///
    /// Returns the updated page; on any error the input page is unchanged.
    pub async fn fetch(&self, page: &BallotPage) -> Result<BallotPage, FetchError> {
        let url = ballot_url(&self.url_template, page.key)?;
        info!("Fetching {}", url);

        let body = self.source.fetch_page(&url).await?;
        let body = body.trim().to_string();

        let classification =
            classify(&body).ok_or(FetchError::UnexpectedClassification { url: url.clone() })?;
        match classification {
            Classification::NoSignal => warn!("Ballot URL does not contain precinct information"),
            Classification::ConfirmedEmpty => info!("Ballot URL contains precinct information"),
            Classification::BallotPresent(tables) => {
                info!("Ballot URL contains precinct information ({} tables)", tables)
            }
        }

        let mut updated = page.clone();
        updated.apply_fetch(body, classification, Utc::now());
        Ok(updated)
    }
}
