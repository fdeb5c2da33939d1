//! Parameter Sweeps
//!
//! Many independent runs of the cascade, each with its own seed and its own
//! reserve and population, executed in parallel.
//!
//! ## Sweeps
//! - Seed sweep: same scenario, different random populations
//! - Shock sweep: same population seed, increasing price drops
//!
//! ## Metrics
//! - Value at Risk (VaR) of bad debt at 95%, 99%
//! - Expected Shortfall (CVaR) at 95%, 99%
//! - Bad debt probability
//! - Round counts and final prices

use rayon::prelude::*;
use serde::Serialize;

use crate::cascade::CascadeOutcome;
use crate::config::{CascadeLimits, SimulationConfig};
use crate::error::SimulationError;
use crate::simulation::{run_simulation_with_limits, RunSummary};

/// Seed sweep statistics over bad debt and cascade length
#[derive(Clone, Debug, Serialize)]
pub struct SweepSummary {
    pub runs: usize,

    pub mean_bad_debt: f64,
    pub max_bad_debt: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub bad_debt_probability: f64,

    pub mean_rounds: f64,
    pub max_rounds: usize,
    pub mean_final_price: f64,
    pub min_final_price: f64,
    pub non_convergent_runs: usize,
    pub market_collapses: usize,
}

impl SweepSummary {
    pub fn print(&self) {
        println!("  Runs:                    {}", self.runs);
        println!("  Mean bad debt:           ${:.0}", self.mean_bad_debt);
        println!("  Max bad debt:            ${:.0}", self.max_bad_debt);
        println!("  Bad debt probability:    {:.2}%", self.bad_debt_probability * 100.0);
        println!("  VaR 95%:                 ${:.0}", self.var_95);
        println!("  VaR 99%:                 ${:.0}", self.var_99);
        println!("  CVaR 95%:                ${:.0}", self.cvar_95);
        println!("  CVaR 99%:                ${:.0}", self.cvar_99);
        println!("  Mean rounds:             {:.1}", self.mean_rounds);
        println!("  Max rounds:              {}", self.max_rounds);
        println!("  Mean final price:        ${:.2}", self.mean_final_price);
        println!("  Min final price:         ${:.2}", self.min_final_price);
        println!("  Non-convergent runs:     {}", self.non_convergent_runs);
        println!("  Market collapses:        {}", self.market_collapses);
    }
}

/// Final state of one shock level
#[derive(Clone, Debug, Serialize)]
pub struct ShockPoint {
    pub price_drop_fraction: f64,
    pub summary: RunSummary,
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn expected_shortfall(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let cutoff_idx = (((sorted.len() as f64) * p).ceil() as usize).min(sorted.len());
    let tail = &sorted[cutoff_idx..];
    if tail.is_empty() {
        return sorted[sorted.len() - 1];
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Run `config` once per seed in `seeds`, in parallel
pub fn run_seed_sweep(
    config: &SimulationConfig,
    limits: CascadeLimits,
    seeds: &[u64],
) -> Result<Vec<RunSummary>, SimulationError> {
    config.validate_with_limits(&limits)?;

    seeds
        .par_iter()
        .map(|&seed| {
            run_simulation_with_limits(config.clone(), limits, seed)
                .map(|result| result.summary().clone())
        })
        .collect()
}

/// Run the same population seed through each price drop in `drops`
pub fn run_shock_sweep(
    config: &SimulationConfig,
    limits: CascadeLimits,
    drops: &[f64],
    seed: u64,
) -> Result<Vec<ShockPoint>, SimulationError> {
    drops
        .par_iter()
        .map(|&drop| {
            let scenario = config.clone().with_price_drop(drop);
            run_simulation_with_limits(scenario, limits, seed).map(|result| ShockPoint {
                price_drop_fraction: drop,
                summary: result.summary().clone(),
            })
        })
        .collect()
}

pub fn aggregate(summaries: &[RunSummary]) -> SweepSummary {
    let runs = summaries.len();
    let n = runs.max(1) as f64;

    let mut bad_debts: Vec<f64> = summaries.iter().map(|s| s.total_bad_debt_usd).collect();
    bad_debts.sort_by(f64::total_cmp);

    SweepSummary {
        runs,
        mean_bad_debt: bad_debts.iter().sum::<f64>() / n,
        max_bad_debt: bad_debts.iter().copied().fold(0.0, f64::max),
        var_95: percentile(&bad_debts, 0.95),
        var_99: percentile(&bad_debts, 0.99),
        cvar_95: expected_shortfall(&bad_debts, 0.95),
        cvar_99: expected_shortfall(&bad_debts, 0.99),
        bad_debt_probability: bad_debts.iter().filter(|&&d| d > 0.0).count() as f64 / n,
        mean_rounds: summaries.iter().map(|s| s.rounds as f64).sum::<f64>() / n,
        max_rounds: summaries.iter().map(|s| s.rounds).max().unwrap_or(0),
        mean_final_price: summaries.iter().map(|s| s.final_price).sum::<f64>() / n,
        min_final_price: summaries
            .iter()
            .map(|s| s.final_price)
            .fold(f64::INFINITY, f64::min),
        non_convergent_runs: summaries
            .iter()
            .filter(|s| s.outcome == CascadeOutcome::NonConvergent)
            .count(),
        market_collapses: summaries
            .iter()
            .filter(|s| s.outcome == CascadeOutcome::MarketCollapse)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::run_simulation;

    fn small_config() -> SimulationConfig {
        SimulationConfig::default().with_users(200, 0.02)
    }

    #[test]
    fn test_var_calculation() {
        let sorted: Vec<f64> = (0..100).map(|i| i as f64 * 100.0).collect();

        let var_95 = percentile(&sorted, 0.95);
        assert!((9000.0..=9600.0).contains(&var_95));
        assert_eq!(percentile(&[], 0.95), 0.0);

        // tail is indices 95..100
        let cvar_95 = expected_shortfall(&sorted, 0.95);
        assert!((cvar_95 - 9700.0).abs() < 1e-9);
        assert_eq!(expected_shortfall(&sorted, 1.0), 9900.0);
    }

    #[test]
    fn test_seed_sweep_matches_sequential_runs() {
        let config = small_config();
        let seeds: Vec<u64> = (0..8).collect();
        let summaries = run_seed_sweep(&config, CascadeLimits::default(), &seeds).unwrap();

        assert_eq!(summaries.len(), 8);
        for (summary, &seed) in summaries.iter().zip(&seeds) {
            let sequential = run_simulation(config.clone(), seed).unwrap();
            assert_eq!(summary, sequential.summary());
        }
    }

    #[test]
    fn test_shock_sweep_deepens_drawdown() {
        let drops = [0.0, 0.2, 0.4, 0.6];
        let points =
            run_shock_sweep(&small_config(), CascadeLimits::default(), &drops, 42).unwrap();

        assert_eq!(points.len(), 4);
        assert_eq!(points[0].summary.rounds, 0);
        assert_eq!(points[0].summary.total_bad_debt_usd, 0.0);
        for pair in points.windows(2) {
            assert!(pair[1].summary.final_price < pair[0].summary.final_price);
        }
    }

    #[test]
    fn test_invalid_config_fails_sweep() {
        let config = small_config().with_liquidity_depth(-1.0);
        assert!(run_seed_sweep(&config, CascadeLimits::default(), &[1, 2]).is_err());
        assert!(run_shock_sweep(&small_config(), CascadeLimits::default(), &[0.2, 1.5], 1).is_err());

        let below_floor = small_config().with_start_price(1e-12);
        assert!(run_seed_sweep(&below_floor, CascadeLimits::default(), &[1]).is_err());
    }

    #[test]
    fn test_aggregate() {
        let seeds: Vec<u64> = (0..20).collect();
        let config = small_config().with_price_drop(0.5);
        let summaries = run_seed_sweep(&config, CascadeLimits::default(), &seeds).unwrap();
        let agg = aggregate(&summaries);

        assert_eq!(agg.runs, 20);
        assert!(agg.mean_bad_debt <= agg.max_bad_debt);
        assert!(agg.var_95 <= agg.max_bad_debt);
        assert!(agg.cvar_99 >= agg.var_95 || agg.max_bad_debt == 0.0);
        assert!((0.0..=1.0).contains(&agg.bad_debt_probability));
        assert!(agg.min_final_price <= agg.mean_final_price);
        assert!(agg.min_final_price > 0.0);
    }
}
