//! Ballot proposition tables.

use tracing::{debug, info, warn};

use super::Lookup;
use crate::models::{District, DistrictCategory, Proposal};
use crate::parser::context::{BallotItem, ParseContext};
use crate::parser::table::Table;
use crate::parser::text::{clean_district_category, titleize};
use crate::parser::InterpretError;

/// Marker trailing the category in a proposal division heading.
const PROPOSALS_MARKER: &str = "PROPOSALS";

pub(super) fn proposal(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<Option<BallotItem>, InterpretError> {
    if !table.is_class("proposal") {
        return Ok(None);
    }

    let title = table
        .find_text("proposalTitle")
        .ok_or_else(|| InterpretError::MalformedTable("missing proposal title".into()))?;
    let text = table
        .find_text("proposalText")
        .ok_or_else(|| InterpretError::MalformedTable("missing proposal text".into()))?;
    let name = titleize(&title);

    let category = resolve_category(table, ctx, lookup)?;
    info!("Parsed category: {}", category.name);

    let district = resolve_district(&category, &name, &text, ctx, lookup)?;
    info!("Parsed district: {}", district);

    debug!("Parsing proposal from text: {:?}", text.trim());
    let proposal = Proposal {
        election_id: ctx.election.sos_id,
        district,
        name,
        description: text.trim().to_string(),
    };
    info!("Parsed proposal: {}", proposal);
    Ok(Some(BallotItem::Proposal(proposal)))
}

fn resolve_category(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<DistrictCategory, InterpretError> {
    match table.find_text("division") {
        Some(heading) => {
            debug!("Parsing category from division: {:?}", heading.trim());
            let prefix = heading.split(PROPOSALS_MARKER).next().unwrap_or_default();
            let name = clean_district_category(prefix);
            let aliased = lookup.config.alias(&name);
            if aliased != name {
                warn!("Assuming category is {}", aliased.to_lowercase());
            }
            lookup.category(aliased)
        }
        None => {
            let district = ctx
                .active_district
                .as_ref()
                .ok_or(InterpretError::MissingContext("district for proposal category"))?;
            debug!("Reusing category from previous district: {}", district);
            Ok(district.category.clone())
        }
    }
}

fn resolve_district(
    category: &DistrictCategory,
    title: &str,
    text: &str,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<District, InterpretError> {
    let precinct = &ctx.precinct;

    if category.is("State") {
        debug!("Inferring district as state");
        return lookup.statewide(category);
    }
    if category.is("County") {
        debug!("Inferring district as county");
        return Ok(precinct.county.clone());
    }
    if lookup.config.is_jurisdiction_category(&category.name) {
        debug!("Inferring district as jurisdiction");
        return Ok(precinct.jurisdiction.clone());
    }

    debug!("Parsing district from title: {:?}", title);
    if let Some((prefix, _)) = title.split_once(category.name.as_str()) {
        return lookup.district(category, prefix.trim());
    }
    if text.contains(precinct.jurisdiction.name.as_str()) {
        warn!("Assuming district is jurisdiction from proposal");
        return Ok(precinct.jurisdiction.clone());
    }
    if text.contains(precinct.county.name.as_str()) {
        warn!("Assuming district is county from proposal");
        return Ok(precinct.county.clone());
    }

    Err(InterpretError::UnresolvedDistrict(title.to_string()))
}
