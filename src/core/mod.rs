mod engine;
mod error;
mod metrics;
mod solver;
mod types;

pub use engine::{
    MonthlyReturnModel, deflate, deflation_factors, generate_returns, monthly_inflation_rate,
    project, project_nominal, simulate,
};
pub use error::{Result, SimulationError};
pub use metrics::{goal_probability, summarize};
pub use solver::{
    ContributionSolveConfig, ContributionSolveResult, SolveIteration, solve_required_contribution,
};
pub use types::{
    MONTHS_PER_YEAR, Matrix, NominalBalanceMatrix, OutcomeSummary, Projection, RealBalanceMatrix,
    ReturnMatrix, Scenario, SimulationParameters,
};
