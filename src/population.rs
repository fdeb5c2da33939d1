//! Borrower population generation
//!
//! The first `floor(num_users * whale_concentration)` positions are whales,
//! the rest retail. Each position draws a collateral amount and a target
//! health factor from its cohort profile, and debt is back-solved so the
//! position opens exactly at that health factor:
//!
//! `debt = collateral * price * LT / target_health_factor`
//!
//! All randomness comes from the caller's RNG, so a seeded stream reproduces
//! the population exactly.

use rand::Rng;
use rand_distr::Exp1;

use crate::config::SimulationConfig;
use crate::position::{BorrowerPosition, Cohort};
use crate::reserve::ReserveParameters;

/// How a cohort's collateral amount is drawn
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollateralDraw {
    Uniform { low: f64, high: f64 },
    Exponential { mean: f64 },
}

/// Draw ranges for one cohort
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CohortProfile {
    pub collateral: CollateralDraw,
    pub min_health_factor: f64,
    pub max_health_factor: f64,
}

/// Large positions, moderately safe
pub const WHALE_PROFILE: CohortProfile = CohortProfile {
    collateral: CollateralDraw::Uniform {
        low: 1000.0,
        high: 10_000.0,
    },
    min_health_factor: 1.2,
    max_health_factor: 1.8,
};

/// Small positions, wide health factor spread
pub const RETAIL_PROFILE: CohortProfile = CohortProfile {
    collateral: CollateralDraw::Exponential { mean: 10.0 },
    min_health_factor: 1.01,
    max_health_factor: 2.0,
};

impl CohortProfile {
    /// Draw `(collateral, target_health_factor)`, in that order
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let collateral = match self.collateral {
            CollateralDraw::Uniform { low, high } => rng.gen_range(low..high),
            CollateralDraw::Exponential { mean } => {
                let unit: f64 = rng.sample(Exp1);
                unit * mean
            }
        };
        let target_hf = rng.gen_range(self.min_health_factor..self.max_health_factor);
        (collateral, target_hf)
    }
}

#[derive(Clone, Debug)]
pub struct PopulationGenerator {
    num_users: usize,
    whale_count: usize,
    whale: CohortProfile,
    retail: CohortProfile,
}

impl PopulationGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            num_users: config.num_users,
            whale_count: config.whale_count(),
            whale: WHALE_PROFILE,
            retail: RETAIL_PROFILE,
        }
    }

    pub fn whale_count(&self) -> usize {
        self.whale_count
    }

    pub fn cohort_of(&self, index: usize) -> Cohort {
        if index < self.whale_count {
            Cohort::Whale
        } else {
            Cohort::Retail
        }
    }

    pub fn profile(&self, cohort: Cohort) -> &CohortProfile {
        match cohort {
            Cohort::Whale => &self.whale,
            Cohort::Retail => &self.retail,
        }
    }

    /// Generate `num_users` positions priced at the reserve's current price
    pub fn generate<R: Rng + ?Sized>(
        &self,
        reserve: &ReserveParameters,
        rng: &mut R,
    ) -> Vec<BorrowerPosition> {
        (0..self.num_users)
            .map(|id| {
                let cohort = self.cohort_of(id);
                let (collateral, target_hf) = self.profile(cohort).draw(rng);
                let debt = collateral * reserve.price() * reserve.liquidation_threshold() / target_hf;
                BorrowerPosition::new(id, cohort, collateral, debt)
            })
            .collect()
    }
}

/// Aggregate view of a freshly generated population
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopulationStats {
    pub whales: usize,
    pub retail: usize,
    pub total_collateral: f64,
    pub total_debt: f64,
    pub min_health_factor: f64,
}

impl PopulationStats {
    pub fn collect(positions: &[BorrowerPosition], reserve: &ReserveParameters) -> Self {
        let whales = positions
            .iter()
            .filter(|p| p.cohort() == Cohort::Whale)
            .count();

        Self {
            whales,
            retail: positions.len() - whales,
            total_collateral: positions.iter().map(|p| p.collateral()).sum(),
            total_debt: positions.iter().map(|p| p.debt()).sum(),
            min_health_factor: positions
                .iter()
                .map(|p| p.health_factor(reserve))
                .fold(f64::INFINITY, f64::min),
        }
    }
}
