//! The ordered recognizer chain.
//!
//! Every recognizer either declines a table (`Ok(None)`) or claims it. A
//! claim that cannot be completed is an error, never a decline. Recognizers
//! only read the context; the assembler applies context updates.

mod header;
mod party;
mod position;
mod proposal;

pub use position::NO_CANDIDATES;

use super::context::{BallotItem, ParseContext};
use super::table::Table;
use super::{InterpretError, ReferenceData};
use crate::config::ParserConfig;
use crate::models::{District, DistrictCategory, Party};

/// Heuristics and reference data available to every recognizer.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    pub config: &'a ParserConfig,
    pub refs: &'a dyn ReferenceData,
}

impl<'a> Lookup<'a> {
    pub fn new(config: &'a ParserConfig, refs: &'a dyn ReferenceData) -> Self {
        Self { config, refs }
    }

    pub(crate) fn category(&self, name: &str) -> Result<DistrictCategory, InterpretError> {
        self.refs
            .category(name)?
            .ok_or_else(|| InterpretError::UnresolvedCategory(name.to_string()))
    }

    pub(crate) fn district(
        &self,
        category: &DistrictCategory,
        name: &str,
    ) -> Result<District, InterpretError> {
        self.refs
            .district(category, name)?
            .ok_or_else(|| InterpretError::UnknownDistrict {
                category: category.name.clone(),
                name: name.to_string(),
            })
    }

    pub(crate) fn party(&self, name: &str) -> Result<Party, InterpretError> {
        self.refs
            .party(name)?
            .ok_or_else(|| InterpretError::UnknownParty(name.to_string()))
    }

    /// The single statewide district within a category.
    pub(crate) fn statewide(&self, category: &DistrictCategory) -> Result<District, InterpretError> {
        self.district(category, &self.config.statewide_district)
    }
}

/// One table classifier of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognizer {
    PartisanHeader,
    PartySection,
    PartisanPosition,
    GeneralHeader,
    NonpartisanSection,
    NonpartisanPosition,
    ProposalsHeader,
    Proposal,
}

/// Recognizers in the order tables are offered to them.
pub const CHAIN: [Recognizer; 8] = [
    Recognizer::PartisanHeader,
    Recognizer::PartySection,
    Recognizer::PartisanPosition,
    Recognizer::GeneralHeader,
    Recognizer::NonpartisanSection,
    Recognizer::NonpartisanPosition,
    Recognizer::ProposalsHeader,
    Recognizer::Proposal,
];

impl Recognizer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PartisanHeader => "partisan header",
            Self::PartySection => "party section",
            Self::PartisanPosition => "partisan position",
            Self::GeneralHeader => "general header",
            Self::NonpartisanSection => "nonpartisan section",
            Self::NonpartisanPosition => "nonpartisan position",
            Self::ProposalsHeader => "proposals header",
            Self::Proposal => "proposal",
        }
    }

    /// Offer a table to this recognizer.
    pub fn interpret(
        &self,
        table: &Table<'_>,
        ctx: &ParseContext,
        lookup: &Lookup<'_>,
    ) -> Result<Option<BallotItem>, InterpretError> {
        match self {
            Self::PartisanHeader => Ok(header::partisan_header(table)),
            Self::PartySection => party::party_section(table, lookup),
            Self::PartisanPosition => position::partisan_position(table, ctx, lookup),
            Self::GeneralHeader => Ok(header::general_header(table)),
            Self::NonpartisanSection => party::nonpartisan_section(table, lookup),
            Self::NonpartisanPosition => position::nonpartisan_position(table, ctx, lookup),
            Self::ProposalsHeader => Ok(header::proposals_header(table)),
            Self::Proposal => proposal::proposal(table, ctx, lookup),
        }
    }
}

/// Offer a table to each recognizer in order; the first claim wins.
pub fn interpret_table(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<Option<(Recognizer, BallotItem)>, InterpretError> {
    for recognizer in CHAIN {
        if let Some(item) = recognizer.interpret(table, ctx, lookup)? {
            tracing::debug!("Table {} claimed by {}", table.index, recognizer.name());
            return Ok(Some((recognizer, item)));
        }
    }
    Ok(None)
}
