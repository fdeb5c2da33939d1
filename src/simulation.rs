//! Simulation run orchestration
//!
//! Population generation, price shock, liquidation cascade, summary. A run
//! owns its reserve and positions outright, so independent runs share no state.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::cascade::{CascadeOutcome, LiquidationEngine, RoundReport};
use crate::config::{CascadeLimits, SimulationConfig};
use crate::error::SimulationError;
use crate::population::{PopulationGenerator, PopulationStats};
use crate::position::{BorrowerPosition, Cohort};
use crate::reserve::ReserveParameters;
use crate::snapshot::{StageHistory, StageSnapshot};

pub const COLLATERAL_SYMBOL: &str = "ETH";
pub const POST_SHOCK_STAGE: &str = "Post-Shock";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    Stable,
    Critical,
}

impl RiskStatus {
    pub fn from_bad_debt(total_bad_debt_usd: f64) -> Self {
        if total_bad_debt_usd > 0.0 {
            Self::Critical
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => f.write_str("STABLE"),
            Self::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// Terminal aggregate state of a run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub start_price: f64,
    pub final_price: f64,
    /// Fractional decline from start price, shock and slippage combined
    pub price_drawdown: f64,
    pub total_bad_debt_usd: f64,
    pub total_collateral_remaining_usd: f64,
    pub vulnerable_users: usize,
    pub rounds: usize,
    pub total_liquidations: usize,
    pub wipe_outs: usize,
    pub total_collateral_liquidated: f64,
    pub outcome: CascadeOutcome,
    pub risk_status: RiskStatus,
}

impl RunSummary {
    pub fn print(&self) {
        println!("  Final price:             ${:.2}", self.final_price);
        println!("  Price drawdown:          {:.2}%", self.price_drawdown * 100.0);
        println!("  Total bad debt:          ${:.2}", self.total_bad_debt_usd);
        println!(
            "  Collateral remaining:    ${:.2}",
            self.total_collateral_remaining_usd
        );
        println!("  Vulnerable users:        {}", self.vulnerable_users);
        println!("  Rounds:                  {}", self.rounds);
        println!(
            "  Liquidations:            {} ({} wiped out)",
            self.total_liquidations, self.wipe_outs
        );
        println!(
            "  Collateral liquidated:   {:.2} units",
            self.total_collateral_liquidated
        );
        println!("  Outcome:                 {}", self.outcome.name());
        println!("  Risk status:             {}", self.risk_status);
    }
}

/// Losses attributed to one cohort
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CohortBreakdown {
    pub cohort: Cohort,
    pub positions: usize,
    pub liquidated: usize,
    pub wiped_out: usize,
    pub bad_debt_usd: f64,
    pub collateral_seized: f64,
    /// Mean share of opening collateral seized per position
    pub mean_seized_fraction: f64,
}

/// Complete output of a run: snapshots, event log, round reports, summary
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    config: SimulationConfig,
    snapshots: StageHistory,
    rounds: Vec<RoundReport>,
    log: Vec<String>,
    summary: RunSummary,
    #[serde(skip)]
    positions: Vec<BorrowerPosition>,
}

impl RunResult {
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &[StageSnapshot] {
        self.snapshots.as_slice()
    }

    pub fn rounds(&self) -> &[RoundReport] {
        &self.rounds
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn outcome(&self) -> CascadeOutcome {
        self.summary.outcome
    }

    /// Positions in their terminal state
    pub fn positions(&self) -> &[BorrowerPosition] {
        &self.positions
    }

    /// Surface a run that ended without reaching equilibrium
    pub fn ensure_converged(&self) -> Result<(), SimulationError> {
        match self.summary.outcome {
            CascadeOutcome::Settled | CascadeOutcome::NegligibleImpact => Ok(()),
            CascadeOutcome::NonConvergent => Err(SimulationError::NonConvergent {
                rounds: self.summary.rounds,
            }),
            CascadeOutcome::MarketCollapse => Err(SimulationError::MarketCollapse {
                round: self.summary.rounds,
                price: self.summary.final_price,
            }),
        }
    }

    pub fn cohort_breakdown(&self) -> Vec<CohortBreakdown> {
        Cohort::all()
            .into_iter()
            .map(|cohort| {
                let members: Vec<&BorrowerPosition> = self
                    .positions
                    .iter()
                    .filter(|p| p.cohort() == cohort)
                    .collect();

                CohortBreakdown {
                    cohort,
                    positions: members.len(),
                    liquidated: members
                        .iter()
                        .filter(|p| p.collateral() < p.initial_collateral())
                        .count(),
                    wiped_out: members.iter().filter(|p| p.is_terminal()).count(),
                    bad_debt_usd: members.iter().map(|p| p.bad_debt()).sum(),
                    collateral_seized: members
                        .iter()
                        .map(|p| p.initial_collateral() - p.collateral())
                        .sum(),
                    mean_seized_fraction: members
                        .iter()
                        .map(|p| p.collateral_seized_fraction())
                        .sum::<f64>()
                        / members.len().max(1) as f64,
                }
            })
            .collect()
    }
}

/// One simulation run, exclusively owning its reserve and positions
#[derive(Clone, Debug)]
pub struct SimulationRun {
    config: SimulationConfig,
    limits: CascadeLimits,
    reserve: ReserveParameters,
}

impl SimulationRun {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_limits(config, CascadeLimits::default())
    }

    pub fn with_limits(
        config: SimulationConfig,
        limits: CascadeLimits,
    ) -> Result<Self, SimulationError> {
        config.validate_with_limits(&limits)?;
        let reserve = ReserveParameters::new(COLLATERAL_SYMBOL, config.start_price, config.risk);

        Ok(Self {
            config,
            limits,
            reserve,
        })
    }

    /// Generate, shock, cascade. Consumes the run; randomness comes only from `rng`.
    pub fn execute<R: Rng + ?Sized>(self, rng: &mut R) -> RunResult {
        let Self {
            config,
            limits,
            mut reserve,
        } = self;
        let mut log = Vec::new();
        let mut history = StageHistory::new();

        let generator = PopulationGenerator::new(&config);
        let mut positions = generator.generate(&reserve, rng);
        let stats = PopulationStats::collect(&positions, &reserve);
        let line = format!(
            "Generated {} users ({} whales, {} retail). Collateral: {:.2} {}, Debt: ${:.2}",
            positions.len(),
            stats.whales,
            stats.retail,
            stats.total_collateral,
            reserve.symbol(),
            stats.total_debt,
        );
        tracing::info!("{}", line);
        log.push(line);

        let change = reserve.apply_shock(config.price_drop_fraction, limits.price_floor);
        if change.clamped {
            tracing::warn!(
                "Shock of {:.1}% clamped to price floor ${}",
                config.price_drop_fraction * 100.0,
                limits.price_floor
            );
        }
        let line = format!(
            "Phase 1: Shock - {} Price dropped from ${:.2} to ${:.2} (-{:.1}%)",
            reserve.symbol(),
            change.before,
            change.after,
            config.price_drop_fraction * 100.0,
        );
        tracing::info!("{}", line);
        log.push(line);
        history.record(POST_SHOCK_STAGE, &positions, &reserve);

        log.push("Phase 2: Liquidation Cascade".to_string());
        let mut engine =
            LiquidationEngine::new(config.market_liquidity_depth_usd).with_limits(limits);
        let cascade = engine.run(&mut positions, &mut reserve, &mut history);
        log.extend(cascade.rounds.iter().map(RoundReport::log_line));

        let line = format!(
            "Cascade ended after {} rounds: {}. Total liquidated: {:.2} {}",
            cascade.rounds.len(),
            cascade.outcome.name(),
            cascade.total_collateral_seized(),
            reserve.symbol(),
        );
        tracing::info!("{}", line);
        log.push(line);

        let final_state = history
            .last()
            .cloned()
            .unwrap_or_else(|| StageSnapshot::capture("Final", &positions, &reserve));

        let summary = RunSummary {
            start_price: config.start_price,
            final_price: final_state.price,
            price_drawdown: 1.0 - final_state.price / config.start_price,
            total_bad_debt_usd: final_state.total_bad_debt_usd,
            total_collateral_remaining_usd: final_state.total_collateral_usd,
            vulnerable_users: final_state.liquidatable_users,
            rounds: cascade.rounds.len(),
            total_liquidations: cascade.total_liquidations(),
            wipe_outs: cascade.total_wipe_outs(),
            total_collateral_liquidated: cascade.total_collateral_seized(),
            outcome: cascade.outcome,
            risk_status: RiskStatus::from_bad_debt(final_state.total_bad_debt_usd),
        };

        RunResult {
            config,
            snapshots: history,
            rounds: cascade.rounds,
            log,
            summary,
            positions,
        }
    }
}

/// Validate, seed a ChaCha stream with `seed`, and run to completion
pub fn run_simulation(config: SimulationConfig, seed: u64) -> Result<RunResult, SimulationError> {
    run_simulation_with_limits(config, CascadeLimits::default(), seed)
}

pub fn run_simulation_with_limits(
    config: SimulationConfig,
    limits: CascadeLimits,
    seed: u64,
) -> Result<RunResult, SimulationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Ok(SimulationRun::with_limits(config, limits)?.execute(&mut rng))
}
