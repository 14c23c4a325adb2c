//! Elections, precincts and the ballot entities parsed from their pages.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::seed::{self, SeedReport};
use super::store::{BallotStore, SqliteStore};
use super::{schema, to_option, Result};
use crate::models::{District, DistrictCategory, Election, Party, Precinct};
use crate::parser::ReferenceData;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Row counts for status display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BallotCounts {
    pub elections: u64,
    pub precincts: u64,
    pub districts: u64,
    pub positions: u64,
    pub proposals: u64,
    pub candidates: u64,
}

/// SQLite-backed repository for ballot entities.
#[derive(Debug, Clone)]
pub struct BallotRepository {
    db_path: PathBuf,
}

impl BallotRepository {
    /// Create a new ballot repository.
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

    /// Load parties, district categories and the statewide district.
    pub fn seed_reference_data(&self, statewide: &str) -> Result<SeedReport> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let report = seed::seed_reference_data(&tx, statewide)?;
        tx.commit()?;
        Ok(report)
    }

    /// Run `f` against a store inside one transaction. Nothing is committed
    /// unless `f` succeeds.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteStore<'_>) -> Result<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let value = {
            let mut store = SqliteStore::new(&tx);
            f(&mut store)?
        };
        tx.commit()?;
        Ok(value)
    }

    // Elections

    /// Insert or update an election by its upstream id.
    pub fn save_election(&self, election: &Election) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO elections (sos_id, name, date, active, reference_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(sos_id) DO UPDATE SET
                name = excluded.name,
                date = excluded.date,
                active = excluded.active,
                reference_url = excluded.reference_url,
                updated_at = excluded.updated_at
            "#,
            params![
                election.sos_id,
                election.name,
                election.date.format(DATE_FORMAT).to_string(),
                election.active,
                election.reference_url,
                now
            ],
        )?;
        Ok(())
    }

    pub fn get_election(&self, sos_id: u32) -> Result<Option<Election>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM elections WHERE sos_id = ?1")?;
        to_option(stmt.query_row(params![sos_id], row_to_election))
    }

    /// All elections, newest first.
    pub fn list_elections(&self) -> Result<Vec<Election>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM elections ORDER BY date DESC, name")?;
        let elections = stmt
            .query_map([], row_to_election)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(elections)
    }

    // Precincts

    /// Add a precinct, creating its county and jurisdiction if needed.
    /// Returns false if a precinct with this upstream id already exists.
    pub fn add_precinct(&self, precinct: &Precinct) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let added = {
            let mut store = SqliteStore::new(&tx);
            let county = store.find_or_create_district(&precinct.county)?;
            let jurisdiction = store.find_or_create_district(&precinct.jurisdiction)?;
            for (district, found) in [(&precinct.county, county), (&precinct.jurisdiction, jurisdiction)] {
                if found.created {
                    tracing::info!("New district: {}", district);
                }
            }
            let now = Utc::now().to_rfc3339();
            tx.execute(
                r#"
                INSERT INTO precincts (sos_id, county_id, jurisdiction_id, ward, number, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                ON CONFLICT(sos_id) DO NOTHING
                "#,
                params![
                    precinct.sos_id,
                    county.value,
                    jurisdiction.value,
                    precinct.ward,
                    precinct.number,
                    now
                ],
            )? > 0
        };
        tx.commit()?;
        Ok(added)
    }

    pub fn get_precinct(&self, sos_id: u32) -> Result<Option<Precinct>> {
        let conn = self.connect()?;
        let sql = format!("{} WHERE p.sos_id = ?1", PRECINCT_SELECT);
        let mut stmt = conn.prepare(&sql)?;
        to_option(stmt.query_row(params![sos_id], row_to_precinct))
    }

    pub fn list_precincts(&self) -> Result<Vec<Precinct>> {
        let conn = self.connect()?;
        let sql = format!("{} ORDER BY c.name, j.name, p.ward, p.number", PRECINCT_SELECT);
        let mut stmt = conn.prepare(&sql)?;
        let precincts = stmt
            .query_map([], row_to_precinct)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(precincts)
    }

    /// Upstream ids of every known precinct.
    pub fn precinct_ids(&self) -> Result<Vec<u32>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT sos_id FROM precincts ORDER BY sos_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Position names attached to a precinct for an election.
    pub fn position_names(&self, election_id: u32, precinct_sos_id: u32) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT pos.name FROM positions pos
            JOIN position_precincts pp ON pp.position_id = pos.id
            JOIN precincts p ON p.id = pp.precinct_id
            WHERE pos.election_id = ?1 AND p.sos_id = ?2
            ORDER BY pos.id
            "#,
        )?;
        let names = stmt
            .query_map(params![election_id, precinct_sos_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn counts(&self) -> Result<BallotCounts> {
        let conn = self.connect()?;
        let count = |table: &str| -> Result<u64> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        };
        Ok(BallotCounts {
            elections: count("elections")?,
            precincts: count("precincts")?,
            districts: count("districts")?,
            positions: count("positions")?,
            proposals: count("proposals")?,
            candidates: count("candidates")?,
        })
    }
}

impl ReferenceData for BallotRepository {
    fn category(&self, name: &str) -> Result<Option<DistrictCategory>> {
        let conn = self.connect()?;
        to_option(conn.query_row(
            "SELECT name FROM district_categories WHERE name = ?1",
            params![name],
            |row| Ok(DistrictCategory::new(row.get::<_, String>(0)?)),
        ))
    }

    fn district(&self, category: &DistrictCategory, name: &str) -> Result<Option<District>> {
        let conn = self.connect()?;
        to_option(conn.query_row(
            r#"
            SELECT d.name, d.population FROM districts d
            JOIN district_categories c ON c.id = d.category_id
            WHERE c.name = ?1 AND d.name = ?2
            "#,
            params![category.name, name],
            |row| {
                Ok(District {
                    category: category.clone(),
                    name: row.get(0)?,
                    population: row.get(1)?,
                })
            },
        ))
    }

    fn party(&self, name: &str) -> Result<Option<Party>> {
        let conn = self.connect()?;
        to_option(conn.query_row(
            "SELECT name, color FROM parties WHERE name = ?1",
            params![name],
            |row| {
                Ok(Party {
                    name: row.get(0)?,
                    color: row.get(1)?,
                })
            },
        ))
    }
}

const PRECINCT_SELECT: &str = r#"
    SELECT p.sos_id, p.ward, p.number,
           c.name AS county, cc.name AS county_category,
           j.name AS jurisdiction, jc.name AS jurisdiction_category
    FROM precincts p
    JOIN districts c ON c.id = p.county_id
    JOIN district_categories cc ON cc.id = c.category_id
    JOIN districts j ON j.id = p.jurisdiction_id
    JOIN district_categories jc ON jc.id = j.category_id
"#;

fn row_to_precinct(row: &Row<'_>) -> rusqlite::Result<Precinct> {
    Ok(Precinct {
        sos_id: row.get("sos_id")?,
        county: District::new(
            DistrictCategory::new(row.get::<_, String>("county_category")?),
            row.get::<_, String>("county")?,
        ),
        jurisdiction: District::new(
            DistrictCategory::new(row.get::<_, String>("jurisdiction_category")?),
            row.get::<_, String>("jurisdiction")?,
        ),
        ward: row.get("ward")?,
        number: row.get("number")?,
    })
}

fn row_to_election(row: &Row<'_>) -> rusqlite::Result<Election> {
    let date: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
    })?;
    Ok(Election {
        sos_id: row.get("sos_id")?,
        name: row.get("name")?,
        date,
        active: row.get("active")?,
        reference_url: row.get("reference_url")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NONPARTISAN;
    use crate::repository::RepositoryError;
    use tempfile::TempDir;

    fn repo() -> (TempDir, BallotRepository) {
        let dir = TempDir::new().unwrap();
        let repo = BallotRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    fn kent() -> District {
        District::new(DistrictCategory::new("County"), "Kent")
    }

    fn grand_rapids() -> District {
        District::new(DistrictCategory::new("Jurisdiction"), "City of Grand Rapids")
    }

    #[test]
    fn test_seed_is_idempotent() {
        let (_dir, repo) = repo();
        let first = repo.seed_reference_data("Michigan").unwrap();
        assert_eq!(first.parties, 9);
        assert_eq!(first.districts, 1);

        let second = repo.seed_reference_data("Michigan").unwrap();
        assert_eq!(second, SeedReport::default());

        let state = DistrictCategory::new("State");
        assert!(repo.district(&state, "Michigan").unwrap().is_some());
        assert_eq!(repo.party(NONPARTISAN).unwrap().unwrap().color, "#999");
        assert!(repo.category("Village").unwrap().is_some());
        assert!(repo.category("Moon Base").unwrap().is_none());
    }

    #[test]
    fn test_election_round_trip() {
        let (_dir, repo) = repo();
        let election = Election {
            sos_id: 675,
            name: "State Primary".into(),
            date: NaiveDate::from_ymd_opt(2018, 8, 7).unwrap(),
            active: true,
            reference_url: None,
        };
        repo.save_election(&election).unwrap();
        repo.save_election(&election).unwrap();

        assert_eq!(repo.get_election(675).unwrap(), Some(election));
        assert_eq!(repo.list_elections().unwrap().len(), 1);
        assert!(repo.get_election(1).unwrap().is_none());
    }

    #[test]
    fn test_precinct_round_trip() {
        let (_dir, repo) = repo();
        let precinct = Precinct::new(1828, kent(), grand_rapids(), "1", "9").unwrap();
        assert!(repo.add_precinct(&precinct).unwrap());
        assert!(!repo.add_precinct(&precinct).unwrap());

        assert_eq!(repo.get_precinct(1828).unwrap(), Some(precinct));
        assert_eq!(repo.precinct_ids().unwrap(), vec![1828]);
        assert!(repo.district(&kent().category, "Kent").unwrap().is_some());
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let (_dir, repo) = repo();
        let result: Result<()> = repo.transaction(|store| {
            store.find_or_create_district(&kent())?;
            Err(RepositoryError::Invalid("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(repo.counts().unwrap().districts, 0);
    }
}
