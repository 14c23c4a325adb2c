//! Probabilistic staleness selection.
//!
//! Each page is an independent Bernoulli trial with its re-fetch weight as
//! the success probability. No state is kept between passes.

use crate::models::BallotPage;

pub struct Scheduler {
    rng: fastrand::Rng,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic draws, for reproducible passes.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Draw once for a page.
    pub fn is_due(&mut self, page: &BallotPage) -> bool {
        page.is_stale_with(self.rng.f64())
    }

    /// Pages due on this pass, in input order.
    pub fn select_due<I>(&mut self, pages: I) -> Vec<BallotPage>
    where
        I: IntoIterator<Item = BallotPage>,
    {
        pages.into_iter().filter(|page| self.is_due(page)).collect()
    }
}
