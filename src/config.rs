//! Simulation inputs
//!
//! A run is fully determined by a [`SimulationConfig`], the [`CascadeLimits`]
//! guarding the cascade loop, and a random seed.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

pub const DEFAULT_SEED: u64 = 42;

pub const DEFAULT_PRICE_DROP: f64 = 0.30;
pub const DEFAULT_LIQUIDITY_DEPTH_USD: f64 = 2_000_000.0;
pub const DEFAULT_NUM_USERS: usize = 1000;
pub const DEFAULT_WHALE_CONCENTRATION: f64 = 0.01;
pub const DEFAULT_START_PRICE: f64 = 2000.0;

pub const DEFAULT_LIQUIDATION_THRESHOLD: f64 = 0.825;
pub const DEFAULT_LOAN_TO_VALUE: f64 = 0.80;
pub const DEFAULT_LIQUIDATION_BONUS: f64 = 0.05;

const WHALE_COUNT_TOLERANCE: f64 = 1e-9;

pub const DEFAULT_MAX_ROUNDS: usize = 1000;
pub const DEFAULT_PRICE_FLOOR: f64 = 1e-9;

/// Risk parameters of the collateral reserve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParameters {
    pub liquidation_threshold: f64,
    /// Informational; not enforced during the cascade
    pub loan_to_value: f64,
    pub liquidation_bonus: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            liquidation_threshold: DEFAULT_LIQUIDATION_THRESHOLD,
            loan_to_value: DEFAULT_LOAN_TO_VALUE,
            liquidation_bonus: DEFAULT_LIQUIDATION_BONUS,
        }
    }
}

impl RiskParameters {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !is_open_unit(self.liquidation_threshold) {
            Err(SimulationError::invalid(
                "liquidation_threshold",
                "must be in (0, 1]",
            ))
        } else if !is_open_unit(self.loan_to_value) {
            Err(SimulationError::invalid("loan_to_value", "must be in (0, 1]"))
        } else if !is_open_unit(self.liquidation_bonus) {
            Err(SimulationError::invalid(
                "liquidation_bonus",
                "must be in (0, 1]",
            ))
        } else {
            Ok(())
        }
    }
}

/// Scenario configuration, immutable for the duration of a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Instantaneous collateral price drop, as a fraction
    pub price_drop_fraction: f64,
    /// USD volume of selling that moves the price by 1%
    pub market_liquidity_depth_usd: f64,
    pub num_users: usize,
    /// Leading fraction of the population generated as whales
    pub whale_concentration: f64,
    pub start_price: f64,
    pub risk: RiskParameters,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            price_drop_fraction: DEFAULT_PRICE_DROP,
            market_liquidity_depth_usd: DEFAULT_LIQUIDITY_DEPTH_USD,
            num_users: DEFAULT_NUM_USERS,
            whale_concentration: DEFAULT_WHALE_CONCENTRATION,
            start_price: DEFAULT_START_PRICE,
            risk: RiskParameters::default(),
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn with_price_drop(mut self, fraction: f64) -> Self {
        self.price_drop_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_liquidity_depth(mut self, depth_usd: f64) -> Self {
        self.market_liquidity_depth_usd = depth_usd;
        self
    }

    #[must_use]
    pub fn with_users(mut self, num_users: usize, whale_concentration: f64) -> Self {
        self.num_users = num_users;
        self.whale_concentration = whale_concentration;
        self
    }

    #[must_use]
    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    /// Number of leading positions generated as whales
    pub fn whale_count(&self) -> usize {
        // absorb representation error, e.g. 100 * 0.29 = 28.999999999999996
        let product = self.num_users as f64 * self.whale_concentration;
        let whales = (product + WHALE_COUNT_TOLERANCE).floor() as usize;
        whales.min(self.num_users)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !is_closed_unit(self.price_drop_fraction) {
            return Err(SimulationError::invalid(
                "price_drop_fraction",
                "must be in [0, 1]",
            ));
        }
        if !is_positive(self.market_liquidity_depth_usd) {
            return Err(SimulationError::invalid(
                "market_liquidity_depth_usd",
                "must be positive",
            ));
        }
        if self.num_users == 0 {
            return Err(SimulationError::invalid("num_users", "must be at least 1"));
        }
        if !is_closed_unit(self.whale_concentration) {
            return Err(SimulationError::invalid(
                "whale_concentration",
                "must be in [0, 1]",
            ));
        }
        if !is_positive(self.start_price) {
            return Err(SimulationError::invalid("start_price", "must be positive"));
        }
        self.risk.validate()
    }

    /// Validate the configuration together with the limits it will run under
    pub fn validate_with_limits(&self, limits: &CascadeLimits) -> Result<(), SimulationError> {
        self.validate()?;
        limits.validate()?;
        if self.start_price < limits.price_floor {
            return Err(SimulationError::invalid(
                "start_price",
                "must not be below the price floor",
            ));
        }
        Ok(())
    }
}

/// Guards on the cascade loop
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeLimits {
    /// Rounds after which the cascade is reported as non-convergent
    pub max_rounds: usize,
    /// Lowest price the market-impact step may produce
    pub price_floor: f64,
}

impl Default for CascadeLimits {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            price_floor: DEFAULT_PRICE_FLOOR,
        }
    }
}

impl CascadeLimits {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.max_rounds == 0 {
            Err(SimulationError::invalid("max_rounds", "must be at least 1"))
        } else if !is_positive(self.price_floor) {
            Err(SimulationError::invalid("price_floor", "must be positive"))
        } else {
            Ok(())
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_closed_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn is_open_unit(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}
