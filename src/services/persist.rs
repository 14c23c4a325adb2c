//! Storage of parse results through [`BallotStore`].

use tracing::{info, warn};

use crate::models::{District, Position, Proposal};
use crate::parser::BallotItem;
use crate::repository::{BallotStore, RecordId, Result};

/// A stored seat count that disagrees with a later parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMismatch {
    pub position: String,
    pub stored: u32,
    pub parsed: u32,
}

/// Outcome of storing one page's items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub positions: usize,
    pub proposals: usize,
    pub candidates: usize,
    /// Positions and proposals newly attached to the precinct.
    pub attached: usize,
    /// Districts that had to be created during the parse.
    pub created_districts: Vec<District>,
    pub seat_mismatches: Vec<SeatMismatch>,
}

/// Upsert every position and proposal and attach them to the precinct.
pub fn persist_ballot<S: BallotStore>(
    store: &mut S,
    precinct_sos_id: u32,
    items: &[BallotItem],
) -> Result<PersistReport> {
    let precinct = store.precinct_record(precinct_sos_id)?;
    let mut report = PersistReport::default();

    for item in items {
        match item {
            BallotItem::Position(position) => {
                persist_position(store, precinct, position, &mut report)?
            }
            BallotItem::Proposal(proposal) => {
                persist_proposal(store, precinct, proposal, &mut report)?
            }
            BallotItem::Party(_) | BallotItem::Header(_) => {}
        }
    }

    Ok(report)
}

fn ensure_district<S: BallotStore>(
    store: &mut S,
    district: &District,
    report: &mut PersistReport,
) -> Result<()> {
    if store.find_or_create_district(district)?.created {
        warn!("Added missing district: {} ({})", district, district.category);
        report.created_districts.push(district.clone());
    }
    Ok(())
}

fn persist_position<S: BallotStore>(
    store: &mut S,
    precinct: RecordId,
    position: &Position,
    report: &mut PersistReport,
) -> Result<()> {
    if let Some(district) = &position.district {
        ensure_district(store, district, report)?;
    }

    let found = store.find_or_create_position(position)?;
    let stored = found.value;
    if found.created {
        info!("Added position: {}", position);
    } else if stored.seats != position.seats {
        warn!(
            "Number of seats for {} differs: {} vs. {}",
            position, stored.seats, position.seats
        );
        report.seat_mismatches.push(SeatMismatch {
            position: position.to_string(),
            stored: stored.seats,
            parsed: position.seats,
        });
    }
    report.positions += 1;

    if store.attach_position_precinct(stored.id, precinct)? {
        report.attached += 1;
    }

    for candidate in &position.candidates {
        if store.find_or_create_candidate(stored.id, candidate)?.created {
            info!("Added candidate: {}", candidate.name);
        }
        report.candidates += 1;
    }
    Ok(())
}

fn persist_proposal<S: BallotStore>(
    store: &mut S,
    precinct: RecordId,
    proposal: &Proposal,
    report: &mut PersistReport,
) -> Result<()> {
    ensure_district(store, &proposal.district, report)?;

    let found = store.find_or_create_proposal(proposal)?;
    if found.created {
        info!("Added proposal: {}", proposal);
    }
    report.proposals += 1;

    if store.attach_proposal_precinct(found.value, precinct)? {
        report.attached += 1;
    }
    Ok(())
}
