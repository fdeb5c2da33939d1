//! Liquidation Cascade Engine
//!
//! Round-based liquidation with linear market impact. A price shock leaves
//! some positions below a health factor of 1.0; liquidating them sells
//! seized collateral into a market of finite depth, which lowers the price
//! and can push further positions under water.
//!
//! ## Round Pipeline
//! 1. Select positions with health factor < 1.0
//! 2. Order them by debt, largest first (stable on insertion order)
//! 3. Liquidate each: repay `debt * CLOSE_FACTOR`, seize
//!    `repaid * (1 + bonus) / price` collateral, or wipe the position out
//!    when its collateral cannot cover that claim
//! 4. Sell the seized collateral: `slippage = value_sold / depth * 1%`
//! 5. Snapshot at the post-impact price
//! 6. Stop once slippage drops below `NEGLIGIBLE_SLIPPAGE`
//!
//! The loop also stops when nothing is liquidatable, when market impact
//! hits the price floor, or when the round limit is exhausted.

use serde::Serialize;

use crate::config::CascadeLimits;
use crate::position::{BorrowerPosition, LiquidationOutcome};
use crate::reserve::ReserveParameters;
use crate::snapshot::StageHistory;

/// Share of outstanding debt repaid by one liquidation
pub const CLOSE_FACTOR: f64 = 0.5;
/// Slippage under which the cascade is considered settled (0.01%)
pub const NEGLIGIBLE_SLIPPAGE: f64 = 0.0001;
/// Slippage produced by selling exactly one liquidity depth of value
pub const SLIPPAGE_PER_DEPTH: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CascadeOutcome {
    /// No liquidatable position remained
    Settled,
    /// Last round's price impact fell below the negligibility threshold
    NegligibleImpact,
    /// Market impact drove the price to the floor
    MarketCollapse,
    /// Round limit reached with positions still liquidatable
    NonConvergent,
}

impl CascadeOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Settled => "Settled (no liquidatable users)",
            Self::NegligibleImpact => "Converged (negligible price impact)",
            Self::MarketCollapse => "Market collapse (price floor reached)",
            Self::NonConvergent => "Did not converge (round limit)",
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Settled | Self::NegligibleImpact)
    }
}

/// What one cascade round did
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: usize,
    /// Position ids in liquidation order
    #[serde(skip)]
    pub liquidated_ids: Vec<usize>,
    pub partial_liquidations: usize,
    pub wipe_outs: usize,
    pub debt_repaid: f64,
    pub bad_debt_added: f64,
    /// Collateral units seized and sold
    pub collateral_seized: f64,
    pub value_sold_usd: f64,
    pub slippage_fraction: f64,
    pub price_before: f64,
    pub price_after: f64,
    pub price_floored: bool,
}

impl RoundReport {
    pub fn liquidated(&self) -> usize {
        self.liquidated_ids.len()
    }

    /// Human-readable event log line
    pub fn log_line(&self) -> String {
        format!(
            "Round {}: Liquidated {} users. Volume: {:.2} units (${:.2}). Price Impact: -{:.4}% (${:.2} -> ${:.2})",
            self.round,
            self.liquidated(),
            self.collateral_seized,
            self.value_sold_usd,
            self.slippage_fraction * 100.0,
            self.price_before,
            self.price_after,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CascadeReport {
    pub rounds: Vec<RoundReport>,
    pub outcome: CascadeOutcome,
}

impl CascadeReport {
    pub fn total_collateral_seized(&self) -> f64 {
        self.rounds.iter().map(|r| r.collateral_seized).sum()
    }

    pub fn total_liquidations(&self) -> usize {
        self.rounds.iter().map(|r| r.liquidated()).sum()
    }

    pub fn total_wipe_outs(&self) -> usize {
        self.rounds.iter().map(|r| r.wipe_outs).sum()
    }
}

#[derive(Clone, Debug)]
pub struct LiquidationEngine {
    liquidity_depth_usd: f64,
    limits: CascadeLimits,
    round: usize,
}

impl LiquidationEngine {
    pub fn new(liquidity_depth_usd: f64) -> Self {
        Self {
            liquidity_depth_usd,
            limits: CascadeLimits::default(),
            round: 0,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: CascadeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Rounds executed so far
    pub fn rounds(&self) -> usize {
        self.round
    }

    /// Indices of liquidatable positions, largest debt first
    pub fn select_liquidatable(
        positions: &[BorrowerPosition],
        reserve: &ReserveParameters,
    ) -> Vec<usize> {
        let mut selected: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_terminal() && p.is_liquidatable(reserve))
            .map(|(i, _)| i)
            .collect();

        // sort_by is stable: equal debts keep insertion order
        selected.sort_by(|&a, &b| positions[b].debt().total_cmp(&positions[a].debt()));
        selected
    }

    /// Liquidate one position at the reserve's current price
    pub fn liquidate_position(
        position: &mut BorrowerPosition,
        reserve: &ReserveParameters,
    ) -> LiquidationOutcome {
        let price = reserve.price();
        let debt_to_cover = position.debt() * CLOSE_FACTOR;
        let bonus_multiplier = 1.0 + reserve.liquidation_bonus();
        let collateral_to_seize = (debt_to_cover * bonus_multiplier) / price;

        if collateral_to_seize > position.collateral() {
            let collateral_seized = position.collateral();
            let value_taken = collateral_seized * price;
            let theoretical_debt_paid = value_taken / bonus_multiplier;
            let bad_debt = (position.debt() - theoretical_debt_paid).max(0.0);
            position.wipe_out(bad_debt);

            LiquidationOutcome::WipeOut {
                collateral_seized,
                bad_debt,
            }
        } else {
            position.reduce(collateral_to_seize, debt_to_cover);

            LiquidationOutcome::Partial {
                debt_repaid: debt_to_cover,
                collateral_seized: collateral_to_seize,
            }
        }
    }

    /// Linear price impact of selling `value_sold_usd`, uncapped
    pub fn slippage_fraction(&self, value_sold_usd: f64) -> f64 {
        (value_sold_usd / self.liquidity_depth_usd) * SLIPPAGE_PER_DEPTH
    }

    /// Run one round; `None` when nothing is liquidatable
    pub fn run_round(
        &mut self,
        positions: &mut [BorrowerPosition],
        reserve: &mut ReserveParameters,
    ) -> Option<RoundReport> {
        let selected = Self::select_liquidatable(positions, reserve);
        if selected.is_empty() {
            return None;
        }
        self.round += 1;

        let price_before = reserve.price();
        let mut report = RoundReport {
            round: self.round,
            liquidated_ids: Vec::with_capacity(selected.len()),
            partial_liquidations: 0,
            wipe_outs: 0,
            debt_repaid: 0.0,
            bad_debt_added: 0.0,
            collateral_seized: 0.0,
            value_sold_usd: 0.0,
            slippage_fraction: 0.0,
            price_before,
            price_after: price_before,
            price_floored: false,
        };

        for idx in selected {
            let position = &mut positions[idx];
            report.liquidated_ids.push(position.id());

            let outcome = Self::liquidate_position(position, reserve);
            match outcome {
                LiquidationOutcome::Partial { debt_repaid, .. } => {
                    report.partial_liquidations += 1;
                    report.debt_repaid += debt_repaid;
                }
                LiquidationOutcome::WipeOut { bad_debt, .. } => {
                    report.wipe_outs += 1;
                    report.bad_debt_added += bad_debt;
                }
            }
            report.collateral_seized += outcome.collateral_seized();
        }

        report.value_sold_usd = report.collateral_seized * price_before;
        report.slippage_fraction = self.slippage_fraction(report.value_sold_usd);

        let change = reserve.apply_slippage(report.slippage_fraction, self.limits.price_floor);
        report.price_after = change.after;
        report.price_floored = change.clamped;

        Some(report)
    }

    /// Iterate rounds until a terminal condition, recording one snapshot per round
    pub fn run(
        &mut self,
        positions: &mut [BorrowerPosition],
        reserve: &mut ReserveParameters,
        history: &mut StageHistory,
    ) -> CascadeReport {
        let mut rounds = Vec::new();

        let outcome = loop {
            if rounds.len() >= self.limits.max_rounds {
                if Self::select_liquidatable(positions, reserve).is_empty() {
                    break CascadeOutcome::Settled;
                }
                tracing::warn!(
                    "Cascade still active after {} rounds, giving up",
                    self.limits.max_rounds
                );
                break CascadeOutcome::NonConvergent;
            }

            let Some(report) = self.run_round(positions, reserve) else {
                tracing::debug!("No liquidatable users left after {} rounds", rounds.len());
                break CascadeOutcome::Settled;
            };

            history.record(format!("Round {}", report.round), positions, reserve);
            tracing::debug!(
                "Round {}: {} liquidated ({} wiped out), slippage {:.4}%, price ${:.2} -> ${:.2}",
                report.round,
                report.liquidated(),
                report.wipe_outs,
                report.slippage_fraction * 100.0,
                report.price_before,
                report.price_after,
            );

            let floored = report.price_floored;
            let slippage = report.slippage_fraction;
            rounds.push(report);

            if floored {
                tracing::warn!("Market impact hit the price floor, aborting cascade");
                break CascadeOutcome::MarketCollapse;
            }
            if slippage < NEGLIGIBLE_SLIPPAGE {
                break CascadeOutcome::NegligibleImpact;
            }
        };

        CascadeReport { rounds, outcome }
    }
}
