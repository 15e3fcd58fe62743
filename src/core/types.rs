use serde::Serialize;

use super::error::{Result, SimulationError};

pub const MONTHS_PER_YEAR: usize = 12;

/// Preset market assumptions as annual (return, volatility) pairs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Cautious,
    Balanced,
    Aggressive,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Cautious, Scenario::Balanced, Scenario::Aggressive];

    pub fn expected_return_annual(self) -> f64 {
        match self {
            Scenario::Cautious => 0.05,
            Scenario::Balanced => 0.07,
            Scenario::Aggressive => 0.09,
        }
    }

    pub fn volatility_annual(self) -> f64 {
        match self {
            Scenario::Cautious => 0.10,
            Scenario::Balanced => 0.15,
            Scenario::Aggressive => 0.20,
        }
    }
}

/// Inputs for one projection run.
///
/// Returns scale to monthly terms linearly (`r / 12`, `vol / sqrt(12)`);
/// `inflation_annual` converts geometrically.
#[derive(Debug, Clone)]
pub struct SimulationParameters {
    pub years: u32,
    pub start_balance: f64,
    pub monthly_contribution: f64,
    pub expected_return_annual: f64,
    pub volatility_annual: f64,
    pub inflation_annual: f64,
    pub simulations: u32,
    pub seed: u64,
}

impl SimulationParameters {
    pub fn months(&self) -> usize {
        self.years as usize * MONTHS_PER_YEAR
    }

    pub fn validate(&self) -> Result<()> {
        if self.years == 0 {
            return Err(SimulationError::InvalidYears(self.years));
        }
        if self.simulations == 0 {
            return Err(SimulationError::InvalidSimulationCount(self.simulations));
        }

        for (name, value) in [
            ("start_balance", self.start_balance),
            ("monthly_contribution", self.monthly_contribution),
            ("expected_return_annual", self.expected_return_annual),
            ("volatility_annual", self.volatility_annual),
            ("inflation_annual", self.inflation_annual),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::NonFiniteParameter { name, value });
            }
        }

        if self.start_balance < 0.0 {
            return Err(SimulationError::NegativeStartBalance(self.start_balance));
        }
        if self.volatility_annual < 0.0 {
            return Err(SimulationError::NegativeVolatility(self.volatility_annual));
        }
        if self.inflation_annual <= -1.0 {
            return Err(SimulationError::InflationOutOfRange(self.inflation_annual));
        }
        Ok(())
    }
}

/// Dense row-major grid with one row per simulated path.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Simulated monthly returns, `simulations x months`.
pub type ReturnMatrix = Matrix;
/// Nominal balances, `simulations x (months + 1)`.
pub type NominalBalanceMatrix = Matrix;
/// Inflation-adjusted balances, same shape as [`NominalBalanceMatrix`].
pub type RealBalanceMatrix = Matrix;

impl Matrix {
    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        self.iter_rows().map(|row| row[col]).collect()
    }

    /// Last column: the terminal value of every path.
    pub fn final_values(&self) -> Vec<f64> {
        match self.cols {
            0 => Vec::new(),
            cols => self.column(cols - 1),
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary {
    pub median: f64,
    pub mean: f64,
    pub p10: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
    pub goal_probability: f64,
}

impl OutcomeSummary {
    /// Width of the 10th-90th percentile band.
    pub fn spread(&self) -> f64 {
        self.p90 - self.p10
    }
}

/// Real balances for every path together with their terminal summary.
#[derive(Debug, Clone)]
pub struct Projection {
    pub real_balances: RealBalanceMatrix,
    pub summary: OutcomeSummary,
}

impl Projection {
    pub fn final_values(&self) -> Vec<f64> {
        self.real_balances.final_values()
    }

    pub fn sample_paths(&self, limit: usize) -> Vec<Vec<f64>> {
        self.real_balances
            .iter_rows()
            .take(limit)
            .map(<[f64]>::to_vec)
            .collect()
    }
}
