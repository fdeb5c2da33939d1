//! Lending Liquidation Cascade Simulation Library
//!
//! This library simulates a lending protocol under a collateral price shock:
//! a population of leveraged borrowers, the wave of liquidations the shock
//! triggers, and the feedback between liquidation selling and further price
//! decline until the system settles.
//!
//! ## Modules
//!
//! - `config`: scenario configuration, risk parameters and cascade limits
//! - `reserve`: collateral reserve (price and risk parameters)
//! - `position`: borrower positions and health factor valuation
//! - `population`: seeded whale/retail population generation
//! - `cascade`: round-based liquidation engine with market impact
//! - `snapshot`: per-stage aggregate snapshots
//! - `simulation`: run orchestration and summary
//! - `sweep`: parallel seed and shock-size sweeps with VaR/CVaR metrics
//!
//! ## Usage
//!
//! ```bash
//! # Run a single cascade
//! cargo run --bin cascade --release -- --price-drop 0.3
//!
//! # Run seed and shock sweeps
//! cargo run --bin sweep --release
//! ```

pub mod cascade;
pub mod config;
pub mod error;
pub mod population;
pub mod position;
pub mod reserve;
pub mod simulation;
pub mod snapshot;
pub mod sweep;

pub use cascade::{CascadeOutcome, CascadeReport, LiquidationEngine, RoundReport};
pub use config::{CascadeLimits, RiskParameters, SimulationConfig, DEFAULT_SEED};
pub use error::SimulationError;
pub use population::PopulationGenerator;
pub use position::{BorrowerPosition, Cohort, LiquidationOutcome};
pub use reserve::ReserveParameters;
pub use simulation::{
    run_simulation, run_simulation_with_limits, RiskStatus, RunResult, RunSummary, SimulationRun,
};
pub use snapshot::{StageHistory, StageSnapshot};
