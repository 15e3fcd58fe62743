use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use super::error::{Result, SimulationError};
use super::metrics::{summarize, validate_goal};
use super::types::{
    MONTHS_PER_YEAR, Matrix, NominalBalanceMatrix, Projection, RealBalanceMatrix, ReturnMatrix,
    SimulationParameters,
};

/// Per-month normal return model derived from annual inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyReturnModel {
    pub mean: f64,
    pub std_dev: f64,
}

impl MonthlyReturnModel {
    /// `r / 12` drift and `vol / sqrt(12)` volatility.
    pub fn from_annual(expected_return_annual: f64, volatility_annual: f64) -> Self {
        let months = MONTHS_PER_YEAR as f64;
        Self {
            mean: expected_return_annual / months,
            std_dev: volatility_annual / months.sqrt(),
        }
    }

    fn distribution(self) -> Result<Normal<f64>> {
        Normal::new(self.mean, self.std_dev).map_err(|_| SimulationError::InvalidDistribution {
            mean: self.mean,
            std_dev: self.std_dev,
        })
    }
}

/// Run the full pipeline and return real balances for every path.
pub fn project(params: &SimulationParameters) -> Result<RealBalanceMatrix> {
    params.validate()?;
    debug!(
        simulations = params.simulations,
        months = params.months(),
        seed = params.seed,
        "projecting balances"
    );

    let model =
        MonthlyReturnModel::from_annual(params.expected_return_annual, params.volatility_annual);
    let returns = generate_returns(params.simulations, params.months(), model, params.seed)?;
    let nominal = project_nominal(params.start_balance, params.monthly_contribution, &returns);
    drop(returns);
    deflate_in_place(params.inflation_annual, nominal)
}

/// [`project`] followed by a summary of the terminal real balances.
pub fn simulate(params: &SimulationParameters, goal: f64) -> Result<Projection> {
    params.validate()?;
    validate_goal(goal)?;

    let real_balances = project(params)?;
    let summary = summarize(&real_balances.final_values(), goal)?;
    debug!(
        median = summary.median,
        goal_probability = summary.goal_probability,
        "projection summarized"
    );

    Ok(Projection {
        real_balances,
        summary,
    })
}

/// Draw a `simulations x months` matrix of monthly returns.
///
/// Row `i` depends only on `(seed, i)`.
pub fn generate_returns(
    simulations: u32,
    months: usize,
    model: MonthlyReturnModel,
    seed: u64,
) -> Result<ReturnMatrix> {
    if simulations == 0 {
        return Err(SimulationError::InvalidSimulationCount(simulations));
    }
    if months == 0 {
        return Err(SimulationError::InvalidMonths(months));
    }

    let normal = model.distribution()?;
    let mut returns = Matrix::zeros(simulations as usize, months);
    for_each_path(&mut returns, |path, row| {
        let mut rng = path_rng(seed, path);
        fill_returns(row, &normal, &mut rng);
    });
    Ok(returns)
}

fn fill_returns<R: rand::Rng + ?Sized>(row: &mut [f64], normal: &Normal<f64>, rng: &mut R) {
    for cell in row.iter_mut() {
        *cell = normal.sample(rng);
    }
}

/// Accumulate nominal balances with
/// `b[t] = b[t-1] * (1 + r[t-1]) + contribution`.
/// Balances are not floored.
pub fn project_nominal(
    start_balance: f64,
    monthly_contribution: f64,
    returns: &ReturnMatrix,
) -> NominalBalanceMatrix {
    let mut balances = Matrix::zeros(returns.rows(), returns.cols() + 1);
    for_each_path(&mut balances, |path, row| {
        accumulate_path(row, returns.row(path), start_balance, monthly_contribution);
    });
    balances
}

fn accumulate_path(balances: &mut [f64], returns: &[f64], start_balance: f64, contribution: f64) {
    balances[0] = start_balance;
    for (month, monthly_return) in returns.iter().enumerate() {
        balances[month + 1] = balances[month] * (1.0 + monthly_return) + contribution;
    }
}

pub fn monthly_inflation_rate(inflation_annual: f64) -> f64 {
    (1.0 + inflation_annual).powf(1.0 / MONTHS_PER_YEAR as f64) - 1.0
}

/// Cumulative price level for months `0..=months`; entry 0 is exactly 1.
pub fn deflation_factors(inflation_annual: f64, months: usize) -> Vec<f64> {
    let base = 1.0 + monthly_inflation_rate(inflation_annual);
    (0..=months).map(|month| base.powf(month as f64)).collect()
}

/// Divide each column of `nominal` by its deflation factor.
pub fn deflate(inflation_annual: f64, nominal: &NominalBalanceMatrix) -> Result<RealBalanceMatrix> {
    deflate_in_place(inflation_annual, nominal.clone())
}

fn deflate_in_place(
    inflation_annual: f64,
    mut balances: NominalBalanceMatrix,
) -> Result<RealBalanceMatrix> {
    if !inflation_annual.is_finite() {
        return Err(SimulationError::NonFiniteParameter {
            name: "inflation_annual",
            value: inflation_annual,
        });
    }
    if inflation_annual <= -1.0 {
        return Err(SimulationError::InflationOutOfRange(inflation_annual));
    }

    let factors = deflation_factors(inflation_annual, balances.cols().saturating_sub(1));
    for_each_path(&mut balances, |_, row| {
        for (cell, factor) in row.iter_mut().zip(&factors) {
            *cell /= factor;
        }
    });
    Ok(balances)
}

fn for_each_path<F>(matrix: &mut Matrix, fill: F)
where
    F: Fn(usize, &mut [f64]) + Send + Sync,
{
    let cols = matrix.cols();

    #[cfg(feature = "parallel")]
    matrix
        .data_mut()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(path, row)| fill(path, row));

    #[cfg(not(feature = "parallel"))]
    matrix
        .data_mut()
        .chunks_mut(cols)
        .enumerate()
        .for_each(|(path, row)| fill(path, row));
}

fn path_rng(seed: u64, path: usize) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, path as u64))
}

fn derive_seed(base_seed: u64, path: u64) -> u64 {
    splitmix64(splitmix64(base_seed).wrapping_add(path))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
