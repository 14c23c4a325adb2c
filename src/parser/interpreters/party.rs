use tracing::{debug, info};

use super::Lookup;
use crate::models::NONPARTISAN;
use crate::parser::context::BallotItem;
use crate::parser::table::Table;
use crate::parser::text::{first_token, titleize};
use crate::parser::InterpretError;

/// Start of a partisan block: `"Republican Primary"` selects Republican.
pub(super) fn party_section(
    table: &Table<'_>,
    lookup: &Lookup<'_>,
) -> Result<Option<BallotItem>, InterpretError> {
    if !table.is_class("primaryTable") {
        return Ok(None);
    }

    let section = table
        .find_text("partyHeading")
        .ok_or_else(|| InterpretError::MalformedTable("missing party heading".into()))?;
    debug!("Found section: {:?}", section.trim());
    let name = first_token(&section)
        .map(titleize)
        .ok_or_else(|| InterpretError::MalformedTable("blank party heading".into()))?;

    let party = lookup.party(&name)?;
    info!("Parsed party: {}", party);
    Ok(Some(BallotItem::Party(party)))
}

/// Start of the nonpartisan block of a general ballot.
pub(super) fn nonpartisan_section(
    table: &Table<'_>,
    lookup: &Lookup<'_>,
) -> Result<Option<BallotItem>, InterpretError> {
    if !table.is_class("generalTable") {
        return Ok(None);
    }

    let section = table
        .find_text("section")
        .ok_or_else(|| InterpretError::MalformedTable("missing section heading".into()))?;
    debug!("Parsing party from section: {:?}", section.trim());
    let heading = titleize(&section);
    if heading != format!("{} Section", NONPARTISAN) {
        return Err(InterpretError::MalformedTable(format!(
            "unexpected section heading: {}",
            heading
        )));
    }

    let party = lookup.party(NONPARTISAN)?;
    info!("Parsed party: {}", party);
    Ok(Some(BallotItem::Party(party)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::models::Party;
    use crate::parser::fixtures::{self, MemoryReferences};
    use crate::parser::table::page_tables;
    use scraper::Html;

    fn run(
        html: &str,
        f: fn(&Table<'_>, &Lookup<'_>) -> Result<Option<BallotItem>, InterpretError>,
    ) -> Result<Option<BallotItem>, InterpretError> {
        let config = ParserConfig::default();
        let refs = MemoryReferences::seeded();
        let lookup = Lookup::new(&config, &refs);
        let document = Html::parse_document(html);
        let tables = page_tables(&document);
        f(&tables[0], &lookup)
    }

    #[test]
    fn test_party_section_uses_first_token() {
        let html = fixtures::party_table("REPUBLICAN Primary");
        let item = run(&html, party_section).unwrap();
        assert_eq!(item, Some(BallotItem::Party(Party::new("Republican"))));
    }

    #[test]
    fn test_party_section_declines_other_tables() {
        let html = r#"<table class="primaryTable extra"><tr><td class="partyHeading">Republican</td></tr></table>"#;
        assert!(run(html, party_section).unwrap().is_none());
    }

    #[test]
    fn test_party_section_unknown_party_is_fatal() {
        let html = fixtures::party_table("Whig Primary");
        let err = run(&html, party_section).unwrap_err();
        assert!(matches!(err, InterpretError::UnknownParty(name) if name == "Whig"));
    }

    #[test]
    fn test_nonpartisan_section() {
        let html = r#"<table class="generalTable"><tr><td class="section">NONPARTISAN  SECTION</td></tr></table>"#;
        let item = run(html, nonpartisan_section).unwrap();
        assert_eq!(item, Some(BallotItem::Party(Party::new(NONPARTISAN))));

        let html = r#"<table class="generalTable"><tr><td class="section">Partisan Section</td></tr></table>"#;
        assert!(matches!(
            run(html, nonpartisan_section),
            Err(InterpretError::MalformedTable(_))
        ));
    }
}
