//! Find-or-create access to ballot entities by natural key.

use chrono::Utc;
use rusqlite::{params, Connection, Params};

use super::{to_option, RepositoryError, Result};
use crate::models::{Candidate, District, DistrictCategory, Party, Position, Proposal};

/// Storage row identifier.
pub type RecordId = i64;

/// Result of a find-or-create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found<T> {
    pub value: T,
    /// True when the record did not exist before the call.
    pub created: bool,
}

impl<T> Found<T> {
    fn existing(value: T) -> Self {
        Self {
            value,
            created: false,
        }
    }

    fn created(value: T) -> Self {
        Self {
            value,
            created: true,
        }
    }
}

/// A stored position along with its authoritative seat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredPosition {
    pub id: RecordId,
    pub seats: u32,
}

/// Idempotent upserts for everything a parsed ballot touches.
///
/// Every `find_or_create_*` looks the entity up by its natural key and only
/// inserts when nothing matches; non-key fields act as creation defaults.
pub trait BallotStore {
    fn find_or_create_category(&mut self, category: &DistrictCategory) -> Result<Found<RecordId>>;

    fn find_or_create_district(&mut self, district: &District) -> Result<Found<RecordId>>;

    fn find_or_create_party(&mut self, party: &Party) -> Result<Found<RecordId>>;

    /// Key: `(election, district, name)`; `term` and `seats` are defaults.
    fn find_or_create_position(&mut self, position: &Position) -> Result<Found<StoredPosition>>;

    /// Key: `(election, district, name)`; `description` is a default.
    fn find_or_create_proposal(&mut self, proposal: &Proposal) -> Result<Found<RecordId>>;

    /// Key: `(position, name)`; `party` is a default.
    fn find_or_create_candidate(
        &mut self,
        position: RecordId,
        candidate: &Candidate,
    ) -> Result<Found<RecordId>>;

    /// Add a precinct to a position. Returns false if it was already attached.
    fn attach_position_precinct(&mut self, position: RecordId, precinct: RecordId) -> Result<bool>;

    /// Add a precinct to a proposal. Returns false if it was already attached.
    fn attach_proposal_precinct(&mut self, proposal: RecordId, precinct: RecordId) -> Result<bool>;

    /// Resolve a precinct's row from its upstream identifier.
    fn precinct_record(&mut self, sos_id: u32) -> Result<RecordId>;
}

/// [`BallotStore`] over an open SQLite connection or transaction.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn find_id<P: Params>(&self, sql: &str, params: P) -> Result<Option<RecordId>> {
        to_option(self.conn.query_row(sql, params, |row| row.get(0)))
    }

    fn insert<P: Params>(&self, sql: &str, params: P) -> Result<RecordId> {
        self.conn.execute(sql, params)?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl BallotStore for SqliteStore<'_> {
    fn find_or_create_category(&mut self, category: &DistrictCategory) -> Result<Found<RecordId>> {
        if let Some(id) = self.find_id(
            "SELECT id FROM district_categories WHERE name = ?1",
            params![category.name],
        )? {
            return Ok(Found::existing(id));
        }
        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            "INSERT INTO district_categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![category.name, now],
        )?;
        Ok(Found::created(id))
    }

    fn find_or_create_district(&mut self, district: &District) -> Result<Found<RecordId>> {
        let category_id = self.find_or_create_category(&district.category)?.value;
        if let Some(id) = self.find_id(
            "SELECT id FROM districts WHERE category_id = ?1 AND name = ?2",
            params![category_id, district.name],
        )? {
            return Ok(Found::existing(id));
        }
        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            r#"INSERT INTO districts (category_id, name, population, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)"#,
            params![category_id, district.name, district.population, now],
        )?;
        Ok(Found::created(id))
    }

    fn find_or_create_party(&mut self, party: &Party) -> Result<Found<RecordId>> {
        if let Some(id) = self.find_id("SELECT id FROM parties WHERE name = ?1", params![party.name])? {
            return Ok(Found::existing(id));
        }
        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            "INSERT INTO parties (name, color, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![party.name, party.color, now],
        )?;
        Ok(Found::created(id))
    }

    fn find_or_create_position(&mut self, position: &Position) -> Result<Found<StoredPosition>> {
        let district_id = match &position.district {
            Some(district) => Some(self.find_or_create_district(district)?.value),
            None => None,
        };

        let existing = to_option(self.conn.query_row(
            r#"SELECT id, seats FROM positions
               WHERE election_id = ?1 AND district_id IS ?2 AND name = ?3"#,
            params![position.election_id, district_id, position.name],
            |row| {
                Ok(StoredPosition {
                    id: row.get(0)?,
                    seats: row.get(1)?,
                })
            },
        ))?;
        if let Some(stored) = existing {
            return Ok(Found::existing(stored));
        }

        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            r#"INSERT INTO positions (election_id, district_id, name, term, seats, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"#,
            params![
                position.election_id,
                district_id,
                position.name,
                position.term,
                position.seats,
                now
            ],
        )?;
        Ok(Found::created(StoredPosition {
            id,
            seats: position.seats,
        }))
    }

    fn find_or_create_proposal(&mut self, proposal: &Proposal) -> Result<Found<RecordId>> {
        let district_id = self.find_or_create_district(&proposal.district)?.value;
        if let Some(id) = self.find_id(
            "SELECT id FROM proposals WHERE election_id = ?1 AND district_id = ?2 AND name = ?3",
            params![proposal.election_id, district_id, proposal.name],
        )? {
            return Ok(Found::existing(id));
        }
        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            r#"INSERT INTO proposals (election_id, district_id, name, description, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?5)"#,
            params![
                proposal.election_id,
                district_id,
                proposal.name,
                proposal.description,
                now
            ],
        )?;
        Ok(Found::created(id))
    }

    fn find_or_create_candidate(
        &mut self,
        position: RecordId,
        candidate: &Candidate,
    ) -> Result<Found<RecordId>> {
        if let Some(id) = self.find_id(
            "SELECT id FROM candidates WHERE position_id = ?1 AND name = ?2",
            params![position, candidate.name],
        )? {
            return Ok(Found::existing(id));
        }
        let party_id = match &candidate.party {
            Some(party) => Some(self.find_or_create_party(party)?.value),
            None => None,
        };
        let now = Utc::now().to_rfc3339();
        let id = self.insert(
            r#"INSERT INTO candidates (position_id, name, party_id, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)"#,
            params![position, candidate.name, party_id, now],
        )?;
        Ok(Found::created(id))
    }

    fn attach_position_precinct(&mut self, position: RecordId, precinct: RecordId) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO position_precincts (position_id, precinct_id) VALUES (?1, ?2)",
            params![position, precinct],
        )?;
        Ok(rows > 0)
    }

    fn attach_proposal_precinct(&mut self, proposal: RecordId, precinct: RecordId) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO proposal_precincts (proposal_id, precinct_id) VALUES (?1, ?2)",
            params![proposal, precinct],
        )?;
        Ok(rows > 0)
    }

    fn precinct_record(&mut self, sos_id: u32) -> Result<RecordId> {
        self.find_id("SELECT id FROM precincts WHERE sos_id = ?1", params![sos_id])?
            .ok_or_else(|| RepositoryError::NotFound(format!("precinct {}", sos_id)))
    }
}
