use thiserror::Error;

/// Simulation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Configuration rejected before any position is generated
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// Cascade still had liquidatable positions after the round limit
    #[error("Cascade did not converge within {rounds} rounds")]
    NonConvergent { rounds: usize },

    /// Market impact drove the collateral price down to the floor
    #[error("Market collapse in round {round}: price hit floor ${price}")]
    MarketCollapse { round: usize, price: f64 },
}

impl SimulationError {
    pub(crate) const fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidConfig { field, reason }
    }

    /// Check if error was raised before the run started
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if error describes a run that ended without reaching equilibrium
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            Self::NonConvergent { .. } | Self::MarketCollapse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let config_error = SimulationError::invalid("num_users", "must be at least 1");
        assert!(config_error.is_config_error());
        assert!(!config_error.is_terminal_failure());

        let stuck = SimulationError::NonConvergent { rounds: 1000 };
        assert!(stuck.is_terminal_failure());
        assert!(!stuck.is_config_error());

        let collapse = SimulationError::MarketCollapse {
            round: 3,
            price: 1e-9,
        };
        assert!(collapse.is_terminal_failure());
    }

    #[test]
    fn test_error_messages() {
        let err = SimulationError::invalid("start_price", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: start_price must be positive"
        );
        assert_eq!(
            SimulationError::NonConvergent { rounds: 7 }.to_string(),
            "Cascade did not converge within 7 rounds"
        );
    }
}
