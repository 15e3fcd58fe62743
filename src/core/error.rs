use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimulationError>;

/// Every way a projection or summary request can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("years must be >= 1, got {0}")]
    InvalidYears(u32),

    #[error("months must be >= 1, got {0}")]
    InvalidMonths(usize),

    #[error("simulation count must be >= 1, got {0}")]
    InvalidSimulationCount(u32),

    #[error("start balance must be >= 0, got {0}")]
    NegativeStartBalance(f64),

    #[error("annual volatility must be >= 0, got {0}")]
    NegativeVolatility(f64),

    #[error("{name} must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("annual inflation must be > -100%, got {0}")]
    InflationOutOfRange(f64),

    #[error("final values must not be empty")]
    EmptyFinalValues,

    #[error("goal must be a finite number, got {0}")]
    NonFiniteGoal(f64),

    #[error("final value at path {index} is not finite, got {value}")]
    NonFiniteFinalValue { index: usize, value: f64 },

    #[error("invalid return distribution (mean {mean}, std_dev {std_dev})")]
    InvalidDistribution { mean: f64, std_dev: f64 },

    #[error("invalid solver config: {0}")]
    InvalidSolverConfig(&'static str),
}
