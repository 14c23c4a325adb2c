//! Table definitions shared by the repositories.

use rusqlite::Connection;

use super::Result;

pub(crate) fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Raw ballot pages and their fetch state
        CREATE TABLE IF NOT EXISTS ballot_pages (
            election_id INTEGER NOT NULL,
            precinct_id INTEGER NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            fetched INTEGER NOT NULL DEFAULT 0,
            valid INTEGER,
            parsed INTEGER NOT NULL DEFAULT 0,
            table_count INTEGER NOT NULL DEFAULT -1,
            refetch_weight REAL NOT NULL DEFAULT 1.0,
            last_fetch TEXT,
            last_fetch_with_precinct TEXT,
            last_fetch_with_ballot TEXT,
            last_parse TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (election_id, precinct_id)
        );

        CREATE TABLE IF NOT EXISTS district_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS districts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES district_categories(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            population INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (category_id, name)
        );

        CREATE TABLE IF NOT EXISTS parties (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS elections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sos_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            date TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 0,
            reference_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (date, name)
        );

        CREATE TABLE IF NOT EXISTS precincts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sos_id INTEGER NOT NULL UNIQUE,
            county_id INTEGER NOT NULL REFERENCES districts(id) ON DELETE CASCADE,
            jurisdiction_id INTEGER NOT NULL REFERENCES districts(id) ON DELETE CASCADE,
            ward TEXT NOT NULL DEFAULT '',
            number TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (county_id, jurisdiction_id, ward, number)
        );

        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            election_id INTEGER NOT NULL REFERENCES elections(sos_id) ON DELETE CASCADE,
            district_id INTEGER REFERENCES districts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            term TEXT NOT NULL DEFAULT '',
            seats INTEGER NOT NULL DEFAULT 1,
            description TEXT NOT NULL DEFAULT '',
            reference_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- NULL districts must still collide, so index on a coalesced value
        CREATE UNIQUE INDEX IF NOT EXISTS idx_positions_natural_key
            ON positions(election_id, IFNULL(district_id, 0), name);

        CREATE TABLE IF NOT EXISTS position_precincts (
            position_id INTEGER NOT NULL REFERENCES positions(id) ON DELETE CASCADE,
            precinct_id INTEGER NOT NULL REFERENCES precincts(id) ON DELETE CASCADE,
            PRIMARY KEY (position_id, precinct_id)
        );

        CREATE TABLE IF NOT EXISTS proposals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            election_id INTEGER NOT NULL REFERENCES elections(sos_id) ON DELETE CASCADE,
            district_id INTEGER NOT NULL REFERENCES districts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            reference_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (election_id, district_id, name)
        );

        CREATE TABLE IF NOT EXISTS proposal_precincts (
            proposal_id INTEGER NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
            precinct_id INTEGER NOT NULL REFERENCES precincts(id) ON DELETE CASCADE,
            PRIMARY KEY (proposal_id, precinct_id)
        );

        CREATE TABLE IF NOT EXISTS candidates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            position_id INTEGER NOT NULL REFERENCES positions(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            party_id INTEGER REFERENCES parties(id) ON DELETE SET NULL,
            description TEXT NOT NULL DEFAULT '',
            reference_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (position_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_ballot_pages_weight
            ON ballot_pages(refetch_weight);
        CREATE INDEX IF NOT EXISTS idx_positions_election
            ON positions(election_id);
        CREATE INDEX IF NOT EXISTS idx_proposals_election
            ON proposals(election_id);
    "#,
    )?;
    Ok(())
}
