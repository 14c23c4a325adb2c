//! Ballot entities: districts, parties, elections, precincts and ballot items.
//!
//! These are natural-key values. Storage identity (row ids) stays inside the
//! repository layer.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder party for nonpartisan offices.
pub const NONPARTISAN: &str = "Nonpartisan";

/// Placeholder party for candidates without an affiliation.
pub const NO_PARTY_AFFILIATION: &str = "No Party Affiliation";

/// Categories that print without a "District" suffix.
const BARE_CATEGORIES: &[&str] = &["County", "Jurisdiction", "City", "Township"];

/// Classification of a district (County, State, Precinct, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistrictCategory {
    pub name: String,
}

impl DistrictCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

impl fmt::Display for DistrictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if BARE_CATEGORIES.contains(&self.name.as_str()) {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} District", self.name)
        }
    }
}

/// Administrative region bound to ballot items, unique by `(category, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct District {
    pub category: DistrictCategory,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u32>,
}

impl District {
    pub fn new(category: DistrictCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            population: None,
        }
    }

    /// Whether both districts share the same natural key.
    pub fn same_key(&self, other: &District) -> bool {
        self.category == other.category && self.name == other.name
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Affiliation for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Party {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: String::new(),
        }
    }

    pub fn is_nonpartisan(&self) -> bool {
        self.name == NONPARTISAN
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Point in time where voters decide ballot items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Identifier assigned by the elections authority.
    pub sos_id: u32,
    pub name: String,
    pub date: NaiveDate,
    pub active: bool,
    pub reference_url: Option<String>,
}

impl Election {
    /// Name parts as the authority's site renders them.
    pub fn sos_name(&self) -> [String; 2] {
        [
            self.name.clone(),
            self.date.format("%A, %B %-d, %Y").to_string(),
        ]
    }
}

impl fmt::Display for Election {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sos_name().join(" | "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrecinctError {
    #[error("Ward and precinct are missing: sos_id={0}")]
    MissingWardAndNumber(u32),
}

/// Region where all voters share a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precinct {
    pub sos_id: u32,
    pub county: District,
    pub jurisdiction: District,
    pub ward: String,
    pub number: String,
}

impl Precinct {
    /// Build a precinct, blanking ward/number values made only of zeros.
    pub fn new(
        sos_id: u32,
        county: District,
        jurisdiction: District,
        ward: &str,
        number: &str,
    ) -> Result<Self, PrecinctError> {
        let ward = normalize_ward(ward);
        let number = normalize_ward(number);
        if ward.is_empty() && number.is_empty() {
            return Err(PrecinctError::MissingWardAndNumber(sos_id));
        }
        Ok(Self {
            sos_id,
            county,
            jurisdiction,
            ward,
            number,
        })
    }

    /// Name parts as the authority's site renders them.
    pub fn sos_name(&self) -> [String; 2] {
        // Spacing for a missing ward or number matches the upstream site.
        let ward_precinct = match (self.ward.is_empty(), self.number.is_empty()) {
            (false, false) => format!("Ward {} Precinct {}", self.ward, self.number),
            (false, true) => format!("Ward {} ", self.ward),
            _ => format!(" Precinct {}", self.number),
        };
        [
            format!("{} County, Michigan", self.county),
            format!("{}, {}", self.jurisdiction, ward_precinct),
        ]
    }
}

impl fmt::Display for Precinct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sos_name().join(" | "))
    }
}

fn normalize_ward(value: &str) -> String {
    let value = value.trim();
    if value.trim_matches('0').is_empty() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Individual running for a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub party: Option<Party>,
}

/// Ballot item selecting one or more candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub election_id: u32,
    /// `None` for precinct-scoped positions, whose name embeds the precinct.
    pub district: Option<District>,
    pub name: String,
    pub term: String,
    pub seats: u32,
    pub candidates: Vec<Candidate>,
}

impl Position {
    pub fn has_nonpartisan_candidate(&self) -> bool {
        self.candidates
            .iter()
            .any(|c| c.party.as_ref().is_some_and(Party::is_nonpartisan))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.term.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.term)
        }
    }
}

/// Ballot item with a boolean outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub election_id: u32,
    pub district: District,
    pub name: String,
    pub description: String,
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
