//! Office tables: one position and its candidates.

use tracing::{debug, info, warn};

use super::Lookup;
use crate::models::{Candidate, District, DistrictCategory, Position};
use crate::parser::context::{BallotItem, ParseContext};
use crate::parser::table::{element_text, enclosing_row, Table};
use crate::parser::text::{clean_district_category, collapse_whitespace, titleize, trailing_seats};
use crate::parser::InterpretError;

/// Candidate cell text marking an office nobody filed for.
pub const NO_CANDIDATES: &str = "No candidates on ballot";

const OFFICE_TABLE: &str = "tblOffice";

pub(super) fn partisan_position(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<Option<BallotItem>, InterpretError> {
    if ctx.in_nonpartisan_section() || !table.is_class(OFFICE_TABLE) {
        return Ok(None);
    }
    interpret(table, ctx, lookup, false).map(Some)
}

pub(super) fn nonpartisan_position(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
) -> Result<Option<BallotItem>, InterpretError> {
    if !ctx.in_nonpartisan_section() || !table.is_class(OFFICE_TABLE) {
        return Ok(None);
    }
    interpret(table, ctx, lookup, true).map(Some)
}

fn interpret(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
    nonpartisan: bool,
) -> Result<BallotItem, InterpretError> {
    let office = table
        .find_text("office")
        .map(|text| titleize(&text))
        .ok_or_else(|| InterpretError::MalformedTable("missing office cell".into()))?;
    let terms = table.find_all_text("term");

    let category = resolve_category(table, &office, lookup, nonpartisan)?;
    info!("Parsed category: {}", category.name);

    let mut name = office.clone();
    let district = if lookup.config.is_statewide_office(&office) {
        debug!("Parsing district from office: {:?}", office);
        Some(lookup.statewide(&category)?)
    } else if category.is("Precinct") {
        debug!("Parsing district from office: {:?}", office);
        let party = ctx
            .active_party
            .as_ref()
            .ok_or(InterpretError::MissingContext("party for precinct office"))?;
        // Precinct offices share names across precincts; embed the precinct instead.
        name = format!("{} ({} | {})", office, party, ctx.precinct);
        None
    } else if category.is("County") {
        debug!("Parsing district from office: {:?}", office);
        Some(ctx.precinct.county.clone())
    } else {
        let term = terms
            .first()
            .ok_or_else(|| InterpretError::UnresolvedDistrict(office.clone()))?;
        debug!("Parsing district from term: {:?}", term.trim());
        Some(district_from_term(&category, term, lookup)?)
    };
    if let Some(district) = &district {
        info!("Parsed district: {}", district);
    }

    let term = terms
        .last()
        .map(|text| collapse_whitespace(text))
        .unwrap_or_default();
    let seats = trailing_seats(&term);
    debug!("Parsing position from: {:?} when {:?}", office, term);

    let mut position = Position {
        election_id: ctx.election.sos_id,
        district,
        name,
        term,
        seats,
        candidates: Vec::new(),
    };
    position.candidates = candidates(table, ctx, lookup, &position)?;
    info!("Parsed position: {}", position);

    Ok(BallotItem::Position(position))
}

fn resolve_category(
    table: &Table<'_>,
    office: &str,
    lookup: &Lookup<'_>,
    nonpartisan: bool,
) -> Result<DistrictCategory, InterpretError> {
    if let Some(text) = table.find_text("division") {
        let name = clean_district_category(&text);
        if !lookup.config.is_exempt_division(&name) {
            debug!("Parsing category from division: {:?}", text.trim());
            return lookup.category(&name);
        }
    }

    if let Some(name) = lookup.config.office_category(office) {
        debug!("Parsing category from office: {:?}", office);
        return lookup.category(name);
    }

    if nonpartisan {
        let name = clean_district_category(office);
        if let Some(category) = lookup.refs.category(&name)? {
            debug!("Parsing category from office: {:?}", office);
            return Ok(category);
        }
    }

    if let Some(text) = table.find_text("mobileOnly") {
        debug!("Parsing category from 'mobileOnly': {:?}", text.trim());
        return lookup.category(&titleize(&text));
    }

    Err(InterpretError::UnresolvedCategory(office.to_string()))
}

/// Existing district named by the term cell, or a new one to be created.
fn district_from_term(
    category: &DistrictCategory,
    term: &str,
    lookup: &Lookup<'_>,
) -> Result<District, InterpretError> {
    let name = titleize(term);
    if name.is_empty() {
        return Err(InterpretError::MalformedTable("blank term cell".into()));
    }
    match lookup.refs.district(category, &name)? {
        Some(district) => Ok(district),
        None => {
            debug!("District not found, will be created: {} ({})", name, category.name);
            Ok(District::new(category.clone(), name))
        }
    }
}

fn candidates(
    table: &Table<'_>,
    ctx: &ParseContext,
    lookup: &Lookup<'_>,
    position: &Position,
) -> Result<Vec<Candidate>, InterpretError> {
    let cells = table.find_elements("candidate");
    if cells.is_empty() {
        warn!("No candidate cells for {}", position);
        return Ok(Vec::new());
    }

    let mut candidates = Vec::with_capacity(cells.len());
    for cell in cells {
        let name = collapse_whitespace(&element_text(&cell));
        debug!("Parsing candidate: {:?}", name);

        if name == NO_CANDIDATES {
            match &ctx.active_party {
                Some(party) => warn!("No {} candidates for {}", party, position),
                None => warn!("No candidates for {}", position),
            }
            break;
        }
        if name.is_empty() {
            warn!("Skipped blank candidate cell for {}", position);
            continue;
        }

        let party = match row_party(&cell) {
            Some(label) => Some(lookup.party(&label)?),
            None => ctx.active_party.clone(),
        };
        let candidate = Candidate { name, party };
        info!(
            "Parsed candidate: {} ({})",
            candidate.name,
            candidate
                .party
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("unaffiliated")
        );
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Party label printed next to a candidate, if the row has one.
fn row_party(cell: &scraper::ElementRef<'_>) -> Option<String> {
    let row = enclosing_row(cell)?;
    row.descendants()
        .filter_map(scraper::ElementRef::wrap)
        .find(|e| e.value().classes().any(|c| c == "party"))
        .map(|e| titleize(&element_text(&e)))
        .filter(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::models::{Party, NONPARTISAN};
    use crate::parser::fixtures::{self, MemoryReferences};
    use crate::parser::table::page_tables;
    use scraper::Html;

    fn interpret_with(
        html: &str,
        ctx: &ParseContext,
        refs: &MemoryReferences,
    ) -> Result<Option<BallotItem>, InterpretError> {
        let config = ParserConfig::default();
        let lookup = Lookup::new(&config, refs);
        let document = Html::parse_document(html);
        let tables = page_tables(&document);
        match partisan_position(&tables[0], ctx, &lookup)? {
            Some(item) => Ok(Some(item)),
            None => nonpartisan_position(&tables[0], ctx, &lookup),
        }
    }

    fn position(html: &str, ctx: &ParseContext) -> Position {
        match interpret_with(html, ctx, &MemoryReferences::seeded()) {
            Ok(Some(BallotItem::Position(position))) => position,
            other => panic!("expected position, got {:?}", other),
        }
    }

    fn republican_context() -> ParseContext {
        let mut ctx = fixtures::context();
        ctx.active_party = Some(Party::new("Republican"));
        ctx
    }

    #[test]
    fn test_governor_is_statewide() {
        let html = fixtures::office_table(None, "Governor", &["4 Year Term"], &[("Jane Doe", None)]);
        let position = position(&html, &republican_context());
        assert_eq!(position.name, "Governor");
        assert_eq!(position.district.unwrap().name, "Michigan");
        assert_eq!(position.seats, 1);
        assert_eq!(position.term, "4 Year Term");
        assert_eq!(position.candidates.len(), 1);
        assert_eq!(position.candidates[0].party, Some(Party::new("Republican")));
    }

    #[test]
    fn test_senator_category_from_office_lookup() {
        let html = fixtures::office_table(
            None,
            "UNITED STATES SENATOR",
            &["6 Year Term"],
            &[("John Roe", None)],
        );
        let position = position(&html, &republican_context());
        let district = position.district.unwrap();
        assert_eq!(district.category.name, "State");
        assert_eq!(district.name, "Michigan");
    }

    #[test]
    fn test_exempt_division_falls_through() {
        let html = fixtures::office_table(
            Some("Congressional"),
            "Representative in Congress",
            &["3rd District", "2 Year Term"],
            &[("Jane Doe", None)],
        );
        let position = position(&html, &republican_context());
        let district = position.district.unwrap();
        assert_eq!(district.category.name, "US Congress");
        assert_eq!(district.name, "3Rd District");
        assert_eq!(position.term, "2 Year Term");
    }

    #[test]
    fn test_county_category_uses_precinct_county() {
        let html = fixtures::office_table(
            Some("County"),
            "Sheriff",
            &["4 Year Term"],
            &[("Jane Doe", None)],
        );
        let position = position(&html, &republican_context());
        assert_eq!(position.district, Some(fixtures::kent()));
    }

    #[test]
    fn test_precinct_office_embeds_precinct() {
        let html = fixtures::office_table(
            Some("Delegate"),
            "Delegate to County Convention",
            &["2 Year Term - 3 Seats"],
            &[("Jane Doe", None), ("John Roe", None)],
        );
        let position = position(&html, &republican_context());
        assert_eq!(position.district, None);
        assert_eq!(position.seats, 3);
        assert_eq!(
            position.name,
            "Delegate To County Convention (Republican | Kent County, Michigan | City of Grand Rapids, Ward 1 Precinct 9)"
        );
    }

    #[test]
    fn test_sentinel_ends_candidates() {
        let html = fixtures::office_table(
            Some("County"),
            "Drain Commissioner",
            &["4 Year Term"],
            &[("No candidates on ballot", None), ("Jane Doe", None)],
        );
        let position = position(&html, &republican_context());
        assert!(position.candidates.is_empty());
    }

    #[test]
    fn test_missing_candidate_cells_is_not_fatal() {
        let html = fixtures::office_table(Some("County"), "Clerk", &["4 Year Term"], &[]);
        let position = position(&html, &republican_context());
        assert!(position.candidates.is_empty());
    }

    #[test]
    fn test_party_cell_overrides_active_party() {
        let html = fixtures::office_table(
            None,
            "Governor",
            &["4 Year Term"],
            &[("Jane Doe", Some("DEMOCRATIC")), ("John Roe", None)],
        );
        let position = position(&html, &republican_context());
        assert_eq!(position.candidates[0].party, Some(Party::new("Democratic")));
        assert_eq!(position.candidates[1].party, Some(Party::new("Republican")));
    }

    #[test]
    fn test_unknown_candidate_party_is_fatal() {
        let html = fixtures::office_table(
            None,
            "Governor",
            &["4 Year Term"],
            &[("Jane Doe", Some("Whig"))],
        );
        let result = interpret_with(&html, &republican_context(), &MemoryReferences::seeded());
        assert!(matches!(result, Err(InterpretError::UnknownParty(_))));
    }

    #[test]
    fn test_unresolved_category_is_fatal() {
        let html = fixtures::office_table(None, "Dog Catcher", &["4 Year Term"], &[]);
        let result = interpret_with(&html, &republican_context(), &MemoryReferences::seeded());
        assert!(matches!(result, Err(InterpretError::UnresolvedCategory(_))));
    }

    #[test]
    fn test_unknown_district_from_term_is_new() {
        let html = fixtures::office_table(
            Some("State Senate"),
            "State Senator",
            &["29th District", "4 Year Term"],
            &[("Jane Doe", None)],
        );
        let position = position(&html, &republican_context());
        let district = position.district.unwrap();
        assert_eq!(district.category.name, "State Senate");
        assert_eq!(district.name, "29Th District");
    }

    #[test]
    fn test_nonpartisan_category_from_office_name() {
        let mut ctx = fixtures::context();
        ctx.active_party = Some(Party::new(NONPARTISAN));
        let html = fixtures::office_table(
            None,
            "Local School District",
            &["Grand Rapids Public", "4 Year Term - Vote for 2"],
            &[("Jane Doe", None)],
        );
        let position = position(&html, &ctx);
        let district = position.district.as_ref().unwrap();
        assert_eq!(district.category.name, "Local School");
        assert_eq!(district.name, "Grand Rapids Public");
        assert_eq!(position.seats, 2);
        assert!(position.has_nonpartisan_candidate());
    }

    #[test]
    fn test_declines_non_office_tables() {
        let html = fixtures::party_table("Republican Primary");
        let result = interpret_with(&html, &republican_context(), &MemoryReferences::seeded());
        assert!(matches!(result, Ok(None)));
    }
}
