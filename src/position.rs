//! Borrower positions: one collateral asset, one stable debt asset

use serde::Serialize;

use crate::reserve::ReserveParameters;

/// Population segment a position was drawn from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Cohort {
    Whale,
    Retail,
}

impl Cohort {
    pub fn all() -> Vec<Self> {
        vec![Self::Whale, Self::Retail]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Whale => "Whale",
            Self::Retail => "Retail",
        }
    }
}

/// What a single liquidation did to a position
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LiquidationOutcome {
    /// Close-factor share of debt repaid, bonus-adjusted collateral seized
    Partial { debt_repaid: f64, collateral_seized: f64 },
    /// Collateral could not cover the bonus-adjusted claim; position zeroed
    WipeOut { collateral_seized: f64, bad_debt: f64 },
}

impl LiquidationOutcome {
    pub fn collateral_seized(&self) -> f64 {
        match *self {
            Self::Partial {
                collateral_seized, ..
            }
            | Self::WipeOut {
                collateral_seized, ..
            } => collateral_seized,
        }
    }

    pub fn is_wipe_out(&self) -> bool {
        matches!(self, Self::WipeOut { .. })
    }
}

/// A leveraged borrower.
///
/// Collateral and debt only ever decrease; bad debt is written once, when the
/// position is wiped out.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BorrowerPosition {
    id: usize,
    cohort: Cohort,
    collateral: f64,
    debt: f64,
    bad_debt: f64,
    initial_collateral: f64,
    initial_debt: f64,
}

impl BorrowerPosition {
    pub fn new(id: usize, cohort: Cohort, collateral: f64, debt: f64) -> Self {
        Self {
            id,
            cohort,
            collateral,
            debt,
            bad_debt: 0.0,
            initial_collateral: collateral,
            initial_debt: debt,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cohort(&self) -> Cohort {
        self.cohort
    }

    /// Collateral units held
    pub fn collateral(&self) -> f64 {
        self.collateral
    }

    /// Stable debt units owed (1 unit = $1)
    pub fn debt(&self) -> f64 {
        self.debt
    }

    /// USD debt left unbacked by a wipe-out
    pub fn bad_debt(&self) -> f64 {
        self.bad_debt
    }

    pub fn initial_collateral(&self) -> f64 {
        self.initial_collateral
    }

    pub fn initial_debt(&self) -> f64 {
        self.initial_debt
    }

    pub fn collateral_value(&self, reserve: &ReserveParameters) -> f64 {
        self.collateral * reserve.price()
    }

    /// `(collateral * price * LT) / debt`, infinite when debt-free
    pub fn health_factor(&self, reserve: &ReserveParameters) -> f64 {
        if self.debt == 0.0 {
            return f64::INFINITY;
        }
        (self.collateral_value(reserve) * reserve.liquidation_threshold()) / self.debt
    }

    pub fn is_liquidatable(&self, reserve: &ReserveParameters) -> bool {
        self.health_factor(reserve) < 1.0
    }

    /// Fully liquidated: nothing left to seize or repay
    pub fn is_terminal(&self) -> bool {
        self.collateral == 0.0 && self.debt == 0.0
    }

    /// Share of opening collateral already seized
    pub fn collateral_seized_fraction(&self) -> f64 {
        if self.initial_collateral == 0.0 {
            return 0.0;
        }
        1.0 - self.collateral / self.initial_collateral
    }

    pub(crate) fn reduce(&mut self, collateral_seized: f64, debt_repaid: f64) {
        self.collateral = (self.collateral - collateral_seized).max(0.0);
        self.debt = (self.debt - debt_repaid).max(0.0);
    }

    pub(crate) fn wipe_out(&mut self, bad_debt: f64) {
        if !self.is_terminal() {
            self.bad_debt = bad_debt.max(0.0);
        }
        self.collateral = 0.0;
        self.debt = 0.0;
    }
}
