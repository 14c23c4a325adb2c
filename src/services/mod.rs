//! Service layer: fetching, scheduling, persistence of parse results and
//! the crawl loop that ties them together.

pub mod crawler;
pub mod fetcher;
pub mod persist;
pub mod scheduler;

pub use crawler::{CrawlError, Crawler, PageOutcome, ParseSummary, PassSummary};
pub use fetcher::{ballot_url, classify, FetchError, Fetcher, PageSource};
pub use persist::{persist_ballot, PersistReport, SeatMismatch};
pub use scheduler::Scheduler;
