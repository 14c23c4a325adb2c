//! Ballot page interpretation.
//!
//! A page is an ordered sequence of tables. Each table is offered to a fixed
//! chain of recognizers; the first one to claim it produces a
//! [`BallotItem`]. Context carried between tables (active party, active
//! district) lives in [`ParseContext`] and is only updated by the
//! [`BallotAssembler`] after a claim.

mod assembler;
mod context;
pub mod interpreters;
pub mod table;
pub mod text;

pub use assembler::BallotAssembler;
pub use context::{BallotItem, ParseContext};
pub use interpreters::{Recognizer, CHAIN};
pub use table::Table;

use thiserror::Error;

use crate::models::{District, DistrictCategory, PageKey, Party};
use crate::repository::RepositoryError;

/// Read-only lookups of pre-populated reference data.
pub trait ReferenceData {
    fn category(&self, name: &str) -> Result<Option<DistrictCategory>, RepositoryError>;

    fn district(
        &self,
        category: &DistrictCategory,
        name: &str,
    ) -> Result<Option<District>, RepositoryError>;

    fn party(&self, name: &str) -> Result<Option<Party>, RepositoryError>;
}

/// Why a recognizer that claimed a table could not finish interpreting it.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("Could not resolve district category: {0}")]
    UnresolvedCategory(String),
    #[error("Could not resolve district for {0}")]
    UnresolvedDistrict(String),
    #[error("Unknown party: {0}")]
    UnknownParty(String),
    #[error("Unknown district: {name} ({category})")]
    UnknownDistrict { category: String, name: String },
    #[error("Missing context: {0}")]
    MissingContext(&'static str),
    #[error("Malformed table: {0}")]
    MalformedTable(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Fatal failure of a page parse. No results of the page are kept.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected table ({index}) on {page}:\n\n{html}")]
    UnclaimedTable {
        page: PageKey,
        index: usize,
        html: String,
    },
    #[error("Table ({index}) on {page}: {reason}\n\n{html}")]
    Unresolved {
        page: PageKey,
        index: usize,
        html: String,
        reason: InterpretError,
    },
    #[error("Missing reference data: {0}")]
    MissingReference(String),
    #[error("Page has no ballot content: {0}")]
    NotFetched(PageKey),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! In-memory reference data and markup builders shared by parser tests.

    use super::*;
    use crate::models::{Election, Precinct, NONPARTISAN, NO_PARTY_AFFILIATION};
    use chrono::NaiveDate;

    #[derive(Debug, Default)]
    pub struct MemoryReferences {
        pub categories: Vec<DistrictCategory>,
        pub districts: Vec<District>,
        pub parties: Vec<Party>,
    }

    impl MemoryReferences {
        pub fn seeded() -> Self {
            let categories: Vec<DistrictCategory> = crate::repository::SEED_CATEGORIES
                .iter()
                .map(|name| DistrictCategory::new(*name))
                .collect();
            let parties = [NONPARTISAN, NO_PARTY_AFFILIATION, "Democratic", "Republican"]
                .into_iter()
                .map(Party::new)
                .collect();
            let districts = vec![
                District::new(DistrictCategory::new("State"), "Michigan"),
                kent(),
                grand_rapids(),
                District::new(DistrictCategory::new("Local School"), "Grand Rapids Public"),
            ];
            Self {
                categories,
                districts,
                parties,
            }
        }
    }

    impl ReferenceData for MemoryReferences {
        fn category(&self, name: &str) -> Result<Option<DistrictCategory>, RepositoryError> {
            Ok(self.categories.iter().find(|c| c.name == name).cloned())
        }

        fn district(
            &self,
            category: &DistrictCategory,
            name: &str,
        ) -> Result<Option<District>, RepositoryError> {
            Ok(self
                .districts
                .iter()
                .find(|d| d.category == *category && d.name == name)
                .cloned())
        }

        fn party(&self, name: &str) -> Result<Option<Party>, RepositoryError> {
            Ok(self.parties.iter().find(|p| p.name == name).cloned())
        }
    }

    pub fn kent() -> District {
        District::new(DistrictCategory::new("County"), "Kent")
    }

    pub fn grand_rapids() -> District {
        District::new(DistrictCategory::new("Jurisdiction"), "City of Grand Rapids")
    }

    pub fn election() -> Election {
        Election {
            sos_id: 675,
            name: "State Primary".into(),
            date: NaiveDate::from_ymd_opt(2018, 8, 7).unwrap(),
            active: true,
            reference_url: None,
        }
    }

    pub fn precinct() -> Precinct {
        Precinct::new(1828, kent(), grand_rapids(), "1", "9").unwrap()
    }

    pub fn context() -> ParseContext {
        ParseContext::new(election(), precinct())
    }

    /// Wrap table markup in a page body.
    pub fn page(tables: &[String]) -> String {
        format!(
            "<html><body><h1>Sample Ballot</h1><p>Kent County</p>{}</body></html>",
            tables.join("\n")
        )
    }

    pub fn party_table(heading: &str) -> String {
        format!(r#"<table class="primaryTable"><tr><td class="partyHeading">{heading}</td></tr></table>"#)
    }

    /// Office table with optional division, term cells and candidate rows.
    pub fn office_table(
        division: Option<&str>,
        office: &str,
        terms: &[&str],
        candidates: &[(&str, Option<&str>)],
    ) -> String {
        let mut html = String::from(r#"<table class="tblOffice">"#);
        if let Some(division) = division {
            html.push_str(&format!(r#"<tr><td class="division">{division}</td></tr>"#));
        }
        html.push_str(&format!(r#"<tr><td class="office">{office}</td></tr>"#));
        for term in terms {
            html.push_str(&format!(r#"<tr><td class="term">{term}</td></tr>"#));
        }
        for (name, party) in candidates {
            html.push_str(&format!(r#"<tr><td class="candidate">{name}</td>"#));
            if let Some(party) = party {
                html.push_str(&format!(r#"<td class="party">{party}</td>"#));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }

    pub fn proposal_table(division: Option<&str>, title: &str, text: &str) -> String {
        let mut html = String::from(r#"<table class="proposal">"#);
        if let Some(division) = division {
            html.push_str(&format!(r#"<tr><td class="division">{division}</td></tr>"#));
        }
        html.push_str(&format!(
            r#"<tr><td class="proposalTitle">{title}</td></tr><tr><td class="proposalText">{text}</td></tr></table>"#
        ));
        html
    }
}
