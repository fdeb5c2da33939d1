//! Collateral reserve state

use serde::Serialize;

use crate::config::RiskParameters;

/// Price change produced by a shock or a market-impact step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceMove {
    pub before: f64,
    pub after: f64,
    /// Requested move would have gone below the floor
    pub clamped: bool,
}

/// Per-asset risk parameters plus the current collateral price.
///
/// The price only changes through the shock and market-impact steps, both of
/// which keep it at or above a positive floor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReserveParameters {
    symbol: String,
    price: f64,
    risk: RiskParameters,
}

impl ReserveParameters {
    pub fn new(symbol: impl Into<String>, price: f64, risk: RiskParameters) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            risk,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn liquidation_threshold(&self) -> f64 {
        self.risk.liquidation_threshold
    }

    pub fn loan_to_value(&self) -> f64 {
        self.risk.loan_to_value
    }

    pub fn liquidation_bonus(&self) -> f64 {
        self.risk.liquidation_bonus
    }

    /// Instantaneous price drop: `price * (1 - drop_fraction)`
    pub(crate) fn apply_shock(&mut self, drop_fraction: f64, floor: f64) -> PriceMove {
        self.scale_price(1.0 - drop_fraction, floor)
    }

    /// Linear market impact: `price * (1 - slippage_fraction)`
    pub(crate) fn apply_slippage(&mut self, slippage_fraction: f64, floor: f64) -> PriceMove {
        self.scale_price(1.0 - slippage_fraction, floor)
    }

    fn scale_price(&mut self, factor: f64, floor: f64) -> PriceMove {
        let before = self.price;
        let target = before * factor;
        let clamped = !(target >= floor);
        self.price = if clamped { floor } else { target };
        PriceMove {
            before,
            after: self.price,
            clamped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(price: f64) -> ReserveParameters {
        ReserveParameters::new("ETH", price, RiskParameters::default())
    }

    #[test]
    fn test_shock_scales_price() {
        let mut reserve = eth(2000.0);
        let change = reserve.apply_shock(0.30, 1e-9);

        assert!((change.before - 2000.0).abs() < 1e-9);
        assert!((reserve.price() - 1400.0).abs() < 1e-9);
        assert!(!change.clamped);
    }

    #[test]
    fn test_zero_shock_is_identity() {
        let mut reserve = eth(2000.0);
        reserve.apply_shock(0.0, 1e-9);
        assert_eq!(reserve.price(), 2000.0);
    }

    #[test]
    fn test_price_never_reaches_zero() {
        let mut reserve = eth(2000.0);
        let change = reserve.apply_shock(1.0, 1e-9);
        assert!(change.clamped);
        assert_eq!(reserve.price(), 1e-9);

        let mut reserve = eth(2000.0);
        let change = reserve.apply_slippage(3.5, 0.01);
        assert!(change.clamped);
        assert!(reserve.price() > 0.0);
        assert_eq!(reserve.price(), 0.01);
    }

    #[test]
    fn test_risk_parameters_are_fixed() {
        let mut reserve = eth(2000.0);
        reserve.apply_slippage(0.05, 1e-9);

        assert!((reserve.liquidation_threshold() - 0.825).abs() < f64::EPSILON);
        assert!((reserve.loan_to_value() - 0.80).abs() < f64::EPSILON);
        assert!((reserve.liquidation_bonus() - 0.05).abs() < f64::EPSILON);
        assert_eq!(reserve.symbol(), "ETH");
    }
}
