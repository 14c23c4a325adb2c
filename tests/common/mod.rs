//! Shared setup for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use ballotcrawl::models::{District, DistrictCategory, Election, Precinct};
use ballotcrawl::repository::{BallotRepository, PageRepository};
use chrono::NaiveDate;
use tempfile::TempDir;

pub const ELECTION: u32 = 675;
pub const PRECINCT: u32 = 1828;

pub struct TestDb {
    pub dir: TempDir,
    pub path: PathBuf,
    pub pages: PageRepository,
    pub ballots: BallotRepository,
}

/// A seeded database with one election and one precinct.
pub fn setup() -> TestDb {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ballots.db");
    let pages = PageRepository::new(&path).unwrap();
    let ballots = BallotRepository::new(&path).unwrap();
    ballots.seed_reference_data("Michigan").unwrap();
    ballots.save_election(&election()).unwrap();
    ballots.add_precinct(&precinct(PRECINCT)).unwrap();
    TestDb {
        dir,
        path,
        pages,
        ballots,
    }
}

pub fn election() -> Election {
    Election {
        sos_id: ELECTION,
        name: "State Primary".into(),
        date: NaiveDate::from_ymd_opt(2018, 8, 7).unwrap(),
        active: true,
        reference_url: None,
    }
}

pub fn precinct(sos_id: u32) -> Precinct {
    Precinct::new(
        sos_id,
        District::new(DistrictCategory::new("County"), "Kent"),
        District::new(DistrictCategory::new("Jurisdiction"), "City of Grand Rapids"),
        "1",
        &(sos_id % 100).to_string(),
    )
    .unwrap()
}

pub fn ballot_body(tables: &[String]) -> String {
    format!(
        "<html><body><h1>Sample Ballot</h1><p>Kent County, Michigan</p>{}</body></html>",
        tables.join("\n")
    )
}

pub fn party_table(heading: &str) -> String {
    format!(r#"<table class="primaryTable"><tr><td class="partyHeading">{heading}</td></tr></table>"#)
}

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

/// A primary ballot exercising state, county, local and proposal tables.
pub fn primary_ballot() -> String {
    ballot_body(&[
        r#"<table><tr><td class="primarySection">Partisan Section</td></tr></table>"#.into(),
        party_table("Republican Primary"),
        office_table(None, "Governor", &["4 Year Term"], &[("Jane Doe", None)]),
        office_table(
            None,
            "United States Senator",
            &["6 Year Term"],
            &[("John Roe", None), ("Richard Poe", None)],
        ),
        office_table(
            Some("County"),
            "County Commissioner",
            &["2 Year Term - 2 Seats"],
            &[("Mary Major", None)],
        ),
        r#"<table class="mainTable"><tr><td class="section">Nonpartisan Section</td></tr></table>"#.into(),
        r#"<table class="generalTable"><tr><td class="section">Nonpartisan Section</td></tr></table>"#.into(),
        office_table(
            None,
            "Local School District",
            &["Grand Rapids Public", "6 Year Term"],
            &[("Alex Doe", None)],
        ),
        r#"<table><tr><td class="section">Proposal Section</td></tr></table>"#.into(),
        proposal_table(
            Some("COUNTY PROPOSALS"),
            "parks millage",
            "Shall Kent County levy 0.5 mills for parks?",
        ),
    ])
}
