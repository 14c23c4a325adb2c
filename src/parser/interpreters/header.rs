//! Section headers: claimed so they are not fatal, but carry no data.

use tracing::debug;

use crate::parser::context::BallotItem;
use crate::parser::table::{element_text, Table};

fn section_text(table: &Table<'_>, class: &str) -> Option<String> {
    table
        .find_tagged("td", class)
        .first()
        .map(|td| element_text(td).trim().to_string())
}

pub(super) fn partisan_header(table: &Table<'_>) -> Option<BallotItem> {
    let header = section_text(table, "primarySection")?;
    debug!("Found header: {:?}", header);
    header
        .to_lowercase()
        .contains("partisan section")
        .then(|| BallotItem::Header(header))
}

pub(super) fn general_header(table: &Table<'_>) -> Option<BallotItem> {
    if !table.is_class("mainTable") {
        return None;
    }
    let header = section_text(table, "section")?;
    debug!("Found header: {:?}", header);
    header
        .to_lowercase()
        .contains("nonpartisan section")
        .then(|| BallotItem::Header(header))
}

pub(super) fn proposals_header(table: &Table<'_>) -> Option<BallotItem> {
    if !table.has_no_class() {
        return None;
    }
    let header = section_text(table, "section")?;
    debug!("Found header: {:?}", header);
    Some(BallotItem::Header(header))
}
