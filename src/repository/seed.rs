//! Reference data every parse depends on.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::store::{BallotStore, SqliteStore};
use super::Result;
use crate::models::{District, DistrictCategory, NONPARTISAN, NO_PARTY_AFFILIATION};

/// Parties with their display colors.
pub const SEED_PARTIES: &[(&str, &str)] = &[
    // Placeholders
    (NONPARTISAN, "#999"),
    (NO_PARTY_AFFILIATION, "#999"),
    // Parties
    ("Democratic", "#3333FF"),
    ("Green", "#00A95C"),
    ("Libertarian", "#ECC850"),
    ("Natural Law", "#FFF7D6"),
    ("Republican", "#E81B23"),
    ("U.S. Taxpayers", "#A356DE"),
    ("Working Class", "#A30000"),
];

/// District categories known before any page is parsed.
pub const SEED_CATEGORIES: &[&str] = &[
    // State
    "State",
    "County",
    "Jurisdiction",
    "Precinct",
    "US Congress",
    "State Senate",
    "State House",
    // Local
    "City",
    "District Library",
    "Local School",
    "Intermediate School",
    "Township",
    "Metropolitan",
    "Village",
    "Authority",
    "Library",
];

/// Counts of reference rows added by a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub parties: usize,
    pub categories: usize,
    pub districts: usize,
}

pub(crate) fn seed_reference_data(conn: &Connection, statewide: &str) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let now = Utc::now().to_rfc3339();

    for (name, color) in SEED_PARTIES {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM parties WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        conn.execute(
            r#"INSERT INTO parties (name, color, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?3)
               ON CONFLICT(name) DO UPDATE SET
                   color = excluded.color,
                   updated_at = excluded.updated_at"#,
            params![name, color, now],
        )?;
        if exists == 0 {
            tracing::info!("Added party: {}", name);
            report.parties += 1;
        }
    }

    let mut store = SqliteStore::new(conn);
    for name in SEED_CATEGORIES {
        let category = DistrictCategory::new(*name);
        if store.find_or_create_category(&category)?.created {
            tracing::info!("Added district category: {}", category);
            report.categories += 1;
        }
    }

    let state = District::new(DistrictCategory::new("State"), statewide);
    if store.find_or_create_district(&state)?.created {
        tracing::info!("Added district: {}", state);
        report.districts += 1;
    }

    Ok(report)
}
