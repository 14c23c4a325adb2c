use chrono::Utc;
use scraper::Html;
use tracing::info;

use super::context::{BallotItem, ParseContext};
use super::interpreters::{interpret_table, Lookup};
use super::table::page_tables;
use super::{ParseError, ReferenceData};
use crate::config::ParserConfig;
use crate::models::{BallotPage, Election, Precinct};

/// Drives the recognizer chain across every table of a page.
pub struct BallotAssembler<'a> {
    lookup: Lookup<'a>,
}

impl<'a> BallotAssembler<'a> {
    pub fn new(config: &'a ParserConfig, refs: &'a dyn ReferenceData) -> Self {
        Self {
            lookup: Lookup::new(config, refs),
        }
    }

    /// Interpret a page's tables in order.
    ///
    /// Returns every claimed party, position and proposal in table order and
    /// marks the page parsed. Any unclaimed or unresolvable table fails the
    /// whole page and leaves it untouched.
    pub fn assemble(
        &self,
        page: &mut BallotPage,
        election: Election,
        precinct: Precinct,
    ) -> Result<Vec<BallotItem>, ParseError> {
        info!("Parsing HTML for ballot: {}", page.key);
        let items = self.interpret(page, ParseContext::new(election, precinct))?;
        page.mark_parsed(Utc::now());
        Ok(items)
    }

    fn interpret(
        &self,
        page: &BallotPage,
        mut ctx: ParseContext,
    ) -> Result<Vec<BallotItem>, ParseError> {
        let document = Html::parse_document(&page.content);
        let mut items = Vec::new();

        for table in page_tables(&document) {
            let claimed = interpret_table(&table, &ctx, &self.lookup).map_err(|reason| {
                ParseError::Unresolved {
                    page: page.key,
                    index: table.index,
                    html: table.html(),
                    reason,
                }
            })?;

            let Some((_, item)) = claimed else {
                return Err(ParseError::UnclaimedTable {
                    page: page.key,
                    index: table.index,
                    html: table.html(),
                });
            };

            ctx.absorb(&item);
            if !matches!(item, BallotItem::Header(_)) {
                items.push(item);
            }
        }

        Ok(items)
    }
}
