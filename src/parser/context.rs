use crate::models::{District, Election, Party, Position, Precinct, Proposal, NONPARTISAN};

/// A claimed table's typed result.
#[derive(Debug, Clone, PartialEq)]
pub enum BallotItem {
    /// Structural section header; carries no ballot data.
    Header(String),
    Party(Party),
    Position(Position),
    Proposal(Proposal),
}

impl BallotItem {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Party(_) => "party",
            Self::Position(_) => "position",
            Self::Proposal(_) => "proposal",
        }
    }
}

/// State carried across the tables of one page parse.
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub election: Election,
    pub precinct: Precinct,
    pub active_party: Option<Party>,
    pub active_district: Option<District>,
}

impl ParseContext {
    pub fn new(election: Election, precinct: Precinct) -> Self {
        Self {
            election,
            precinct,
            active_party: None,
            active_district: None,
        }
    }

    pub fn in_nonpartisan_section(&self) -> bool {
        self.active_party.as_ref().is_some_and(Party::is_nonpartisan)
    }

    /// Update context from a claimed item.
    pub fn absorb(&mut self, item: &BallotItem) {
        match item {
            BallotItem::Header(_) => {}
            BallotItem::Party(party) => {
                self.active_party = Some(party.clone());
            }
            BallotItem::Position(position) => {
                if !self.in_nonpartisan_section() {
                    if let Some(party) = position
                        .candidates
                        .iter()
                        .filter_map(|c| c.party.as_ref())
                        .find(|p| p.is_nonpartisan())
                    {
                        tracing::info!("Start {} section", NONPARTISAN.to_lowercase());
                        self.active_party = Some(party.clone());
                    }
                }
                self.active_district = position.district.clone();
            }
            BallotItem::Proposal(proposal) => {
                self.active_district = Some(proposal.district.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, DistrictCategory};
    use crate::parser::fixtures;

    fn position(district: Option<District>, parties: &[&str]) -> Position {
        Position {
            election_id: 675,
            district,
            name: "Judge Of Probate".into(),
            term: "6 Year Term".into(),
            seats: 1,
            candidates: parties
                .iter()
                .enumerate()
                .map(|(i, party)| Candidate {
                    name: format!("Candidate {}", i),
                    party: Some(Party::new(*party)),
                })
                .collect(),
        }
    }

    #[test]
    fn test_party_sets_active_party() {
        let mut ctx = fixtures::context();
        ctx.absorb(&BallotItem::Party(Party::new("Democratic")));
        assert_eq!(ctx.active_party, Some(Party::new("Democratic")));
        ctx.absorb(&BallotItem::Header("Nonpartisan Section".into()));
        assert_eq!(ctx.active_party, Some(Party::new("Democratic")));
    }

    #[test]
    fn test_nonpartisan_candidate_switches_party() {
        let mut ctx = fixtures::context();
        ctx.absorb(&BallotItem::Party(Party::new("Republican")));
        ctx.absorb(&BallotItem::Position(position(
            Some(fixtures::kent()),
            &["Republican", NONPARTISAN],
        )));
        assert!(ctx.in_nonpartisan_section());
        assert_eq!(ctx.active_district, Some(fixtures::kent()));
    }

    #[test]
    fn test_position_without_district_clears_active_district() {
        let mut ctx = fixtures::context();
        ctx.active_district = Some(fixtures::kent());
        ctx.absorb(&BallotItem::Position(position(None, &["Republican"])));
        assert_eq!(ctx.active_district, None);
        assert_eq!(ctx.active_party, None);
    }

    #[test]
    fn test_proposal_sets_active_district() {
        let mut ctx = fixtures::context();
        let district = District::new(DistrictCategory::new("Village"), "Sparta");
        ctx.absorb(&BallotItem::Proposal(Proposal {
            election_id: 675,
            district: district.clone(),
            name: "Road Millage".into(),
            description: String::new(),
        }));
        assert_eq!(ctx.active_district, Some(district));
    }
}
