//! Fetch and parse state for a single election/precinct ballot page.
//!
//! Every page carries a re-fetch weight that the scheduler treats as the
//! probability of the page being due on the next pass. The weight only moves
//! when a fetch is classified (see [`BallotPage::apply_fetch`]).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Table count for a page that has never been classified as valid.
pub const UNCLASSIFIED_TABLES: i32 = -1;

/// Weight floor for pages confirmed to exist on the upstream site.
pub const VALID_WEIGHT_FLOOR: f64 = 1.0 / 14.0;

/// Weight floor for pages that did not contain precinct information.
pub const INVALID_WEIGHT_FLOOR: f64 = 1.0 / 28.0;

/// Weight assigned on the first classification after the sentinel count.
pub const FIRST_CLASSIFICATION_WEIGHT: f64 = 0.5;

/// Weight of a page that has never been fetched.
pub const INITIAL_WEIGHT: f64 = 1.0;

/// Natural key of a ballot page: upstream election and precinct identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub election_id: u32,
    pub precinct_id: u32,
}

impl PageKey {
    pub fn new(election_id: u32, precinct_id: u32) -> Self {
        Self {
            election_id,
            precinct_id,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "election {} / precinct {}",
            self.election_id, self.precinct_id
        )
    }
}

/// Outcome of inspecting a fetched page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Upstream has nothing for this precinct (yet).
    NoSignal,
    /// Precinct confirmed but the ballot has no tables.
    ConfirmedEmpty,
    /// Precinct confirmed and the ballot contains this many tables.
    BallotPresent(usize),
}

impl Classification {
    /// Build a valid classification from a table count.
    pub fn from_table_count(tables: usize) -> Self {
        if tables == 0 {
            Self::ConfirmedEmpty
        } else {
            Self::BallotPresent(tables)
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::NoSignal)
    }

    pub fn table_count(&self) -> i32 {
        match self {
            Self::NoSignal => UNCLASSIFIED_TABLES,
            Self::ConfirmedEmpty => 0,
            Self::BallotPresent(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }
}

/// Persisted state of one ballot page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotPage {
    pub key: PageKey,
    /// Last fetched body, empty until the first fetch.
    pub content: String,
    pub fetched: bool,
    pub valid: Option<bool>,
    pub parsed: bool,
    pub table_count: i32,
    pub refetch_weight: f64,
    pub last_fetch: Option<DateTime<Utc>>,
    pub last_fetch_with_precinct: Option<DateTime<Utc>>,
    pub last_fetch_with_ballot: Option<DateTime<Utc>>,
    pub last_parse: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BallotPage {
    /// Create an unfetched page.
    pub fn new(key: PageKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            content: String::new(),
            fetched: false,
            valid: None,
            parsed: false,
            table_count: UNCLASSIFIED_TABLES,
            refetch_weight: INITIAL_WEIGHT,
            last_fetch: None,
            last_fetch_with_precinct: None,
            last_fetch_with_ballot: None,
            last_parse: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this page is due given a uniform draw in `[0, 1)`.
    pub fn is_stale_with(&self, draw: f64) -> bool {
        self.refetch_weight > draw
    }

    /// Whether the stored content is worth handing to the parser.
    pub fn is_parseable(&self) -> bool {
        self.fetched && self.valid == Some(true) && self.table_count > 0
    }

    /// Record a classified fetch and update the re-fetch weight.
    pub fn apply_fetch(&mut self, body: String, classification: Classification, now: DateTime<Utc>) {
        self.fetched = true;
        self.last_fetch = Some(now);
        self.content = body;

        let valid = classification.is_valid();
        self.valid = Some(valid);
        if valid {
            self.last_fetch_with_precinct = Some(now);
        }
        if matches!(classification, Classification::BallotPresent(_)) {
            self.last_fetch_with_ballot = Some(now);
        }

        let table_count = classification.table_count();
        let WeightUpdate { weight, reparse } =
            next_weight(self.refetch_weight, self.table_count, table_count, valid);
        if reparse && self.parsed {
            self.parsed = false;
        }
        self.table_count = table_count;
        self.refetch_weight = weight;
        self.updated_at = now;
    }

    /// Stamp a completed parse.
    pub fn mark_parsed(&mut self, now: DateTime<Utc>) {
        self.parsed = true;
        self.last_parse = Some(now);
        self.updated_at = now;
    }
}

/// Result of the weight rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightUpdate {
    pub weight: f64,
    /// Content changed enough that a previous parse is obsolete.
    pub reparse: bool,
}

/// Compute the next re-fetch weight from the previous and new table counts.
pub fn next_weight(weight: f64, previous_tables: i32, tables: i32, valid: bool) -> WeightUpdate {
    let (weight, reparse) = if tables == previous_tables {
        let floor = if valid {
            VALID_WEIGHT_FLOOR
        } else {
            INVALID_WEIGHT_FLOOR
        };
        (floor.max(weight / 2.0), false)
    } else if previous_tables == UNCLASSIFIED_TABLES {
        (FIRST_CLASSIFICATION_WEIGHT, false)
    } else {
        ((weight + 1.0) / 2.0, tables != 0)
    };

    WeightUpdate {
        weight: round_weight(weight.clamp(0.0, 1.0)),
        reparse,
    }
}

/// Round a weight to three decimal places.
pub fn round_weight(weight: f64) -> f64 {
    (weight * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> BallotPage {
        BallotPage::new(PageKey::new(675, 1828))
    }

    #[test]
    fn test_new_page_is_unclassified() {
        let page = page();
        assert!(!page.fetched);
        assert_eq!(page.table_count, UNCLASSIFIED_TABLES);
        assert_eq!(page.refetch_weight, INITIAL_WEIGHT);
        assert!(page.is_stale_with(0.999));
    }

    #[test]
    fn test_first_classification_sets_half() {
        let mut page = page();
        page.apply_fetch("x".into(), Classification::BallotPresent(12), Utc::now());
        assert_eq!(page.refetch_weight, 0.5);
        assert_eq!(page.table_count, 12);
        assert!(page.last_fetch_with_ballot.is_some());
        assert!(page.last_fetch_with_precinct.is_some());
    }

    #[test]
    fn test_confirmed_empty_stamps_precinct_only() {
        let mut page = page();
        page.apply_fetch("x".into(), Classification::ConfirmedEmpty, Utc::now());
        assert_eq!(page.valid, Some(true));
        assert_eq!(page.table_count, 0);
        assert!(page.last_fetch_with_precinct.is_some());
        assert!(page.last_fetch_with_ballot.is_none());
    }

    #[test]
    fn test_unchanged_valid_decays_to_floor() {
        let mut page = page();
        page.apply_fetch("x".into(), Classification::BallotPresent(3), Utc::now());
        let mut previous = page.refetch_weight;
        for _ in 0..10 {
            page.apply_fetch("x".into(), Classification::BallotPresent(3), Utc::now());
            assert!(page.refetch_weight <= previous);
            assert!(page.refetch_weight >= round_weight(VALID_WEIGHT_FLOOR));
            previous = page.refetch_weight;
        }
        assert_eq!(page.refetch_weight, 0.071);
    }

    #[test]
    fn test_unchanged_invalid_decays_to_lower_floor() {
        let mut page = page();
        for _ in 0..10 {
            page.apply_fetch("x".into(), Classification::NoSignal, Utc::now());
        }
        assert_eq!(page.valid, Some(false));
        assert_eq!(page.table_count, UNCLASSIFIED_TABLES);
        assert_eq!(page.refetch_weight, 0.036);
    }

    #[test]
    fn test_strict_decrease_before_floor() {
        let update = next_weight(0.5, 4, 4, true);
        assert_eq!(update.weight, 0.25);
        let update = next_weight(update.weight, 4, 4, true);
        assert_eq!(update.weight, 0.125);
    }

    #[test]
    fn test_changed_count_moves_toward_one() {
        let update = next_weight(0.25, 4, 6, true);
        assert_eq!(update.weight, 0.625);
        assert!(update.reparse);

        let update = next_weight(0.5, 6, 0, true);
        assert_eq!(update.weight, 0.75);
        assert!(!update.reparse);
    }

    #[test]
    fn test_changed_count_clears_parsed() {
        let mut page = page();
        page.apply_fetch("x".into(), Classification::BallotPresent(3), Utc::now());
        page.mark_parsed(Utc::now());
        page.apply_fetch("y".into(), Classification::BallotPresent(5), Utc::now());
        assert!(!page.parsed);
        assert_eq!(page.refetch_weight, 0.75);
    }

    #[test]
    fn test_emptied_page_keeps_parsed() {
        let mut page = page();
        page.apply_fetch("x".into(), Classification::BallotPresent(3), Utc::now());
        page.mark_parsed(Utc::now());
        page.apply_fetch("y".into(), Classification::ConfirmedEmpty, Utc::now());
        assert!(page.parsed);
    }

    #[test]
    fn test_weight_stays_in_unit_interval() {
        let sequence = [
            Classification::NoSignal,
            Classification::BallotPresent(2),
            Classification::BallotPresent(9),
            Classification::ConfirmedEmpty,
            Classification::NoSignal,
            Classification::NoSignal,
            Classification::BallotPresent(9),
            Classification::BallotPresent(9),
        ];
        let mut page = page();
        for _ in 0..5 {
            for classification in sequence {
                page.apply_fetch(String::new(), classification, Utc::now());
                assert!((0.0..=1.0).contains(&page.refetch_weight));
                assert_eq!(page.refetch_weight, round_weight(page.refetch_weight));
            }
        }
    }
}
