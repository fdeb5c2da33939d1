//! Liquidation Cascade Simulation Binary
//!
//! Runs one stress scenario and prints the stage table, the event log and
//! the final summary, or the whole result as JSON.
//!
//! ## Usage
//! ```bash
//! cargo run --bin cascade --release -- --price-drop 0.5 --liquidity-depth 1000000
//! cargo run --bin cascade --release -- --config scenario.json --json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use lending_simulation::config::{CascadeLimits, SimulationConfig, DEFAULT_SEED};
use lending_simulation::simulation::{run_simulation_with_limits, RunResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cascade")]
#[command(version, about = "Lending protocol liquidation cascade stress test", long_about = None)]
struct Cli {
    /// JSON scenario file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial collateral price drop (0.3 = 30%)
    #[arg(long)]
    price_drop: Option<f64>,

    /// USD volume that moves the price by 1%
    #[arg(long)]
    liquidity_depth: Option<f64>,

    /// Number of simulated borrowers
    #[arg(long, short = 'u')]
    users: Option<usize>,

    /// Leading fraction of borrowers generated as whales
    #[arg(long)]
    whale_concentration: Option<f64>,

    /// Collateral price before the shock
    #[arg(long)]
    start_price: Option<f64>,

    /// Population random seed
    #[arg(long, short = 's', default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Round limit before the cascade is reported as non-convergent
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn scenario(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str::<SimulationConfig>(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };

        if let Some(drop) = self.price_drop {
            config.price_drop_fraction = drop;
        }
        if let Some(depth) = self.liquidity_depth {
            config.market_liquidity_depth_usd = depth;
        }
        if let Some(users) = self.users {
            config.num_users = users;
        }
        if let Some(concentration) = self.whale_concentration {
            config.whale_concentration = concentration;
        }
        if let Some(price) = self.start_price {
            config.start_price = price;
        }
        Ok(config)
    }

    fn limits(&self) -> CascadeLimits {
        let mut limits = CascadeLimits::default();
        if let Some(max_rounds) = self.max_rounds {
            limits.max_rounds = max_rounds;
        }
        limits
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = cli.scenario()?;
    let result = run_simulation_with_limits(config, cli.limits(), cli.seed)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result, cli.seed);
    }

    result.ensure_converged()?;
    Ok(())
}

fn print_report(result: &RunResult, seed: u64) {
    let config = result.config();

    println!("=======================================================");
    println!("  Liquidation Cascade Stress Test");
    println!("=======================================================");
    println!();
    println!("Parameters:");
    println!(
        "  Users: {}, Whales: {:.1}%, Seed: {}",
        config.num_users,
        config.whale_concentration * 100.0,
        seed
    );
    println!(
        "  Start price: ${:.2}, Shock: -{:.1}%",
        config.start_price,
        config.price_drop_fraction * 100.0
    );
    println!(
        "  Liquidity depth: ${:.0} per 1% slippage",
        config.market_liquidity_depth_usd
    );
    println!(
        "  LT: {:.3}, LTV: {:.3}, Bonus: {:.3}",
        config.risk.liquidation_threshold, config.risk.loan_to_value, config.risk.liquidation_bonus
    );
    println!();

    println!("Event log:");
    for line in result.log() {
        println!("  {}", line);
    }
    println!();

    println!("| Stage        |      Price |       Bad Debt | Liquidatable |  Collateral USD |");
    println!("|--------------|------------|----------------|--------------|-----------------|");
    for stage in result.snapshots() {
        println!(
            "| {:12} | ${:9.2} | ${:13.2} | {:12} | ${:14.2} |",
            stage.stage,
            stage.price,
            stage.total_bad_debt_usd,
            stage.liquidatable_users,
            stage.total_collateral_usd,
        );
    }
    println!();

    println!("Cohorts:");
    for cohort in result.cohort_breakdown() {
        println!(
            "  {:7} {:5} positions, {:5} liquidated, {:5} wiped out, {:5.1}% seized, bad debt ${:.2}",
            cohort.cohort.name(),
            cohort.positions,
            cohort.liquidated,
            cohort.wiped_out,
            cohort.mean_seized_fraction * 100.0,
            cohort.bad_debt_usd,
        );
    }
    println!();

    println!("=======================================================");
    println!("  Final Results Summary");
    println!("=======================================================");
    result.summary().print();
}
