use serde::Serialize;

use crate::position::BorrowerPosition;
use crate::reserve::ReserveParameters;

/// Aggregate system state captured at a named stage
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageSnapshot {
    pub stage: String,
    pub price: f64,
    pub total_bad_debt_usd: f64,
    pub liquidatable_users: usize,
    pub total_collateral_usd: f64,
}

impl StageSnapshot {
    pub fn capture(
        stage: impl Into<String>,
        positions: &[BorrowerPosition],
        reserve: &ReserveParameters,
    ) -> Self {
        Self {
            stage: stage.into(),
            price: reserve.price(),
            total_bad_debt_usd: positions.iter().map(|p| p.bad_debt()).sum(),
            liquidatable_users: positions
                .iter()
                .filter(|p| p.is_liquidatable(reserve))
                .count(),
            total_collateral_usd: positions.iter().map(|p| p.collateral_value(reserve)).sum(),
        }
    }
}

/// Append-only sequence of stage snapshots
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StageHistory {
    stages: Vec<StageSnapshot>,
}

impl StageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        stage: impl Into<String>,
        positions: &[BorrowerPosition],
        reserve: &ReserveParameters,
    ) -> &StageSnapshot {
        self.stages.push(StageSnapshot::capture(stage, positions, reserve));
        &self.stages[self.stages.len() - 1]
    }

    pub fn as_slice(&self) -> &[StageSnapshot] {
        &self.stages
    }

    pub fn last(&self) -> Option<&StageSnapshot> {
        self.stages.last()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
