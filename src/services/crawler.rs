//! Scheduling passes: select due pages, fetch them, parse what changed.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{error, info};

use super::fetcher::{FetchError, Fetcher, PageSource};
use super::persist::{persist_ballot, PersistReport};
use super::scheduler::Scheduler;
use crate::config::ParserConfig;
use crate::models::{BallotPage, PageKey};
use crate::parser::{BallotAssembler, ParseError};
use crate::repository::{BallotRepository, PageRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Page is not tracked: {0}")]
    NotTracked(PageKey),
    #[error("Fetch failed for {page}: {source}")]
    Fetch { page: PageKey, source: FetchError },
    #[error("Parse failed for {page}: {source}")]
    Parse { page: PageKey, source: ParseError },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of parsing and storing one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSummary {
    pub key: PageKey,
    /// Parties, positions and proposals claimed from the page.
    pub items: usize,
    pub report: PersistReport,
}

/// Result of processing one due page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub key: PageKey,
    pub table_count: i32,
    pub refetch_weight: f64,
    pub parse: Option<ParseSummary>,
}

/// Totals for one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub tracked: usize,
    pub due: usize,
    pub fetched: usize,
    pub parsed: usize,
    pub failed: usize,
}

pub struct Crawler<S> {
    fetcher: Fetcher<S>,
    pages: PageRepository,
    ballots: BallotRepository,
    parser: ParserConfig,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl<S: PageSource> Crawler<S> {
    pub fn new(
        fetcher: Fetcher<S>,
        pages: PageRepository,
        ballots: BallotRepository,
        parser: ParserConfig,
        workers: usize,
    ) -> Self {
        Self {
            fetcher,
            pages,
            ballots,
            parser,
            workers: workers.max(1),
            progress: None,
        }
    }

    /// Advance a progress bar as pages finish.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn load(&self, key: PageKey) -> Result<BallotPage, CrawlError> {
        self.pages.get(key)?.ok_or(CrawlError::NotTracked(key))
    }

    /// Fetch one tracked page and store its new state.
    pub async fn fetch_page(&self, key: PageKey) -> Result<BallotPage, CrawlError> {
        let page = self.load(key)?;
        self.fetch(&page).await
    }

    async fn fetch(&self, page: &BallotPage) -> Result<BallotPage, CrawlError> {
        let updated = self
            .fetcher
            .fetch(page)
            .await
            .map_err(|source| CrawlError::Fetch {
                page: page.key,
                source,
            })?;
        self.pages.save(&updated)?;
        Ok(updated)
    }

    /// Parse one stored page and store its ballot items.
    pub fn parse_page(&self, key: PageKey) -> Result<ParseSummary, CrawlError> {
        let mut page = self.load(key)?;
        self.parse(&mut page)
    }

    fn parse(&self, page: &mut BallotPage) -> Result<ParseSummary, CrawlError> {
        let key = page.key;
        let wrap = |source: ParseError| CrawlError::Parse { page: key, source };

        if !page.is_parseable() {
            return Err(wrap(ParseError::NotFetched(key)));
        }
        let election = self
            .ballots
            .get_election(key.election_id)?
            .ok_or_else(|| wrap(ParseError::MissingReference(format!("election {}", key.election_id))))?;
        let precinct = self
            .ballots
            .get_precinct(key.precinct_id)?
            .ok_or_else(|| wrap(ParseError::MissingReference(format!("precinct {}", key.precinct_id))))?;

        // Interpret on a copy so a failure leaves the stored page untouched.
        let mut parsed = page.clone();
        let items = BallotAssembler::new(&self.parser, &self.ballots)
            .assemble(&mut parsed, election, precinct)
            .map_err(wrap)?;
        let report = self
            .ballots
            .transaction(|store| persist_ballot(store, key.precinct_id, &items))?;

        self.pages.save(&parsed)?;
        *page = parsed;

        info!(
            "Parsed {} items for {} ({} newly attached)",
            items.len(),
            key,
            report.attached
        );
        Ok(ParseSummary {
            key,
            items: items.len(),
            report,
        })
    }

    /// Fetch a due page, then parse it if it has unparsed ballot content.
    pub async fn process(&self, page: BallotPage) -> Result<PageOutcome, CrawlError> {
        let mut page = self.fetch(&page).await?;
        let parse = if page.is_parseable() && !page.parsed {
            Some(self.parse(&mut page)?)
        } else {
            None
        };
        Ok(PageOutcome {
            key: page.key,
            table_count: page.table_count,
            refetch_weight: page.refetch_weight,
            parse,
        })
    }

    /// Run one scheduling pass over every tracked page.
    ///
    /// Each page appears at most once per pass, so no page is worked on by
    /// two workers at the same time. Failed pages are logged and left for a
    /// later pass.
    pub async fn run_pass(
        &self,
        scheduler: &mut Scheduler,
        limit: Option<usize>,
    ) -> Result<PassSummary, CrawlError> {
        let pages = self.pages.all()?;
        let tracked = pages.len();
        let mut due = scheduler.select_due(pages);
        if let Some(limit) = limit {
            due.truncate(limit);
        }
        info!("{} of {} tracked pages are due", due.len(), tracked);

        if let Some(progress) = &self.progress {
            progress.set_length(due.len() as u64);
            progress.set_position(0);
        }

        let mut summary = PassSummary {
            tracked,
            due: due.len(),
            ..Default::default()
        };

        let mut results = stream::iter(due)
            .map(|page| self.process(page))
            .buffer_unordered(self.workers);

        while let Some(result) = results.next().await {
            match result {
                Ok(outcome) => {
                    summary.fetched += 1;
                    if outcome.parse.is_some() {
                        summary.parsed += 1;
                    }
                }
                Err(e) => {
                    error!("{}", e);
                    summary.failed += 1;
                }
            }
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        Ok(summary)
    }
}
