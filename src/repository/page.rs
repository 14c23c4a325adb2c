//! Ballot page repository.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{parse_datetime, parse_datetime_opt, schema, to_option, Result};
use crate::models::{BallotPage, PageKey};

/// Aggregate fetch/parse counts across tracked pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageStats {
    pub total: u64,
    pub fetched: u64,
    pub valid: u64,
    pub with_ballot: u64,
    pub parsed: u64,
    pub mean_weight: f64,
}

/// SQLite-backed repository for ballot page state.
#[derive(Debug, Clone)]
pub struct PageRepository {
    db_path: PathBuf,
}

impl PageRepository {
    /// Create a new page repository.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        schema::init_schema(&repo.connect()?)?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    /// Get a page by key.
    pub fn get(&self, key: PageKey) -> Result<Option<BallotPage>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT * FROM ballot_pages WHERE election_id = ?1 AND precinct_id = ?2")?;
        to_option(stmt.query_row(params![key.election_id, key.precinct_id], row_to_page))
    }

    /// Get all tracked pages.
    pub fn all(&self) -> Result<Vec<BallotPage>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM ballot_pages ORDER BY election_id, precinct_id")?;
        let pages = stmt
            .query_map([], row_to_page)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    /// Start tracking a page. Returns false if it was already tracked.
    pub fn track(&self, key: PageKey) -> Result<bool> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            r#"INSERT OR IGNORE INTO ballot_pages (election_id, precinct_id, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?3)"#,
            params![key.election_id, key.precinct_id, now],
        )?;
        Ok(rows > 0)
    }

    /// Save a page.
    pub fn save(&self, page: &BallotPage) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO ballot_pages (
                election_id, precinct_id, content, fetched, valid, parsed,
                table_count, refetch_weight, last_fetch, last_fetch_with_precinct,
                last_fetch_with_ballot, last_parse, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(election_id, precinct_id) DO UPDATE SET
                content = excluded.content,
                fetched = excluded.fetched,
                valid = excluded.valid,
                parsed = excluded.parsed,
                table_count = excluded.table_count,
                refetch_weight = excluded.refetch_weight,
                last_fetch = excluded.last_fetch,
                last_fetch_with_precinct = excluded.last_fetch_with_precinct,
                last_fetch_with_ballot = excluded.last_fetch_with_ballot,
                last_parse = excluded.last_parse,
                updated_at = excluded.updated_at
            "#,
            params![
                page.key.election_id,
                page.key.precinct_id,
                page.content,
                page.fetched,
                page.valid,
                page.parsed,
                page.table_count,
                page.refetch_weight,
                page.last_fetch.map(|dt| dt.to_rfc3339()),
                page.last_fetch_with_precinct.map(|dt| dt.to_rfc3339()),
                page.last_fetch_with_ballot.map(|dt| dt.to_rfc3339()),
                page.last_parse.map(|dt| dt.to_rfc3339()),
                page.created_at.to_rfc3339(),
                page.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Aggregate counts for status display.
    pub fn stats(&self) -> Result<PageStats> {
        let conn = self.connect()?;
        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(fetched), 0),
                COALESCE(SUM(CASE WHEN valid = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN table_count > 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(parsed), 0),
                COALESCE(AVG(refetch_weight), 0.0)
            FROM ballot_pages
            "#,
            [],
            |row| {
                Ok(PageStats {
                    total: row.get::<_, i64>(0)? as u64,
                    fetched: row.get::<_, i64>(1)? as u64,
                    valid: row.get::<_, i64>(2)? as u64,
                    with_ballot: row.get::<_, i64>(3)? as u64,
                    parsed: row.get::<_, i64>(4)? as u64,
                    mean_weight: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn row_to_page(row: &Row<'_>) -> rusqlite::Result<BallotPage> {
    Ok(BallotPage {
        key: PageKey::new(row.get("election_id")?, row.get("precinct_id")?),
        content: row.get("content")?,
        fetched: row.get("fetched")?,
        valid: row.get("valid")?,
        parsed: row.get("parsed")?,
        table_count: row.get("table_count")?,
        refetch_weight: row.get("refetch_weight")?,
        last_fetch: parse_datetime_opt(row.get("last_fetch")?),
        last_fetch_with_precinct: parse_datetime_opt(row.get("last_fetch_with_precinct")?),
        last_fetch_with_ballot: parse_datetime_opt(row.get("last_fetch_with_ballot")?),
        last_parse: parse_datetime_opt(row.get("last_parse")?),
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;
    use tempfile::TempDir;

    fn repo() -> (TempDir, PageRepository) {
        let dir = TempDir::new().unwrap();
        let repo = PageRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_track_is_idempotent() {
        let (_dir, repo) = repo();
        let key = PageKey::new(676, 1828);
        assert!(repo.track(key).unwrap());
        assert!(!repo.track(key).unwrap());

        let page = repo.get(key).unwrap().unwrap();
        assert_eq!(page.table_count, -1);
        assert_eq!(page.refetch_weight, 1.0);
        assert_eq!(page.valid, None);
        assert!(!page.fetched);
    }

    #[test]
    fn test_save_round_trips_fetch_state() {
        let (_dir, repo) = repo();
        let mut page = BallotPage::new(PageKey::new(675, 42));
        page.apply_fetch("<html/>".into(), Classification::BallotPresent(4), Utc::now());
        repo.save(&page).unwrap();

        let loaded = repo.get(page.key).unwrap().unwrap();
        assert_eq!(loaded.valid, Some(true));
        assert_eq!(loaded.table_count, 4);
        assert_eq!(loaded.refetch_weight, 0.5);
        assert!(loaded.last_fetch_with_ballot.is_some());
        assert_eq!(loaded.content, "<html/>");
    }

    #[test]
    fn test_stats() {
        let (_dir, repo) = repo();
        repo.track(PageKey::new(1, 1)).unwrap();
        let mut page = BallotPage::new(PageKey::new(1, 2));
        page.apply_fetch(String::new(), Classification::NoSignal, Utc::now());
        repo.save(&page).unwrap();

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.fetched, 1);
        assert_eq!(stats.valid, 0);
        assert_eq!(stats.parsed, 0);
    }

    #[test]
    fn test_missing_page() {
        let (_dir, repo) = repo();
        assert!(repo.get(PageKey::new(9, 9)).unwrap().is_none());
    }
}
