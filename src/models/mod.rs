//! Data models for ballotcrawl.

mod ballot;
mod page;

pub use ballot::{
    Candidate, District, DistrictCategory, Election, Party, Position, Precinct, PrecinctError,
    Proposal, NONPARTISAN, NO_PARTY_AFFILIATION,
};
pub use page::{
    next_weight, round_weight, BallotPage, Classification, PageKey, WeightUpdate,
    FIRST_CLASSIFICATION_WEIGHT, INITIAL_WEIGHT, INVALID_WEIGHT_FLOOR, UNCLASSIFIED_TABLES,
    VALID_WEIGHT_FLOOR,
};
