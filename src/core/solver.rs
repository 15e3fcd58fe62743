use serde::Serialize;
use tracing::info;

use super::engine::project;
use super::error::{Result, SimulationError};
use super::metrics::goal_probability;
use super::types::SimulationParameters;

const PROBABILITY_SLACK: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct ContributionSolveConfig {
    pub goal: f64,
    pub target_probability: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub simulations_per_iteration: u32,
    pub final_simulations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_contribution: f64,
    pub goal_probability: f64,
    pub probability_ci_half_width: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSolveResult {
    pub goal: f64,
    pub target_probability: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub simulations_per_iteration: u32,
    pub final_simulations: u32,
    pub solved_contribution: Option<f64>,
    pub achieved_probability: Option<f64>,
    pub achieved_ci_half_width: Option<f64>,
    pub iterations: Vec<SolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Bisect for the smallest monthly contribution whose goal probability
/// reaches `config.target_probability`.
/// Every candidate is projected with `params.seed`.
pub fn solve_required_contribution(
    params: &SimulationParameters,
    config: ContributionSolveConfig,
) -> Result<ContributionSolveResult> {
    params.validate()?;
    validate_config(config)?;

    let mut iterations = Vec::new();
    let per_iteration = config.simulations_per_iteration;
    let low_eval = evaluate_candidate(params, config, config.search_min, per_iteration)?;
    let high_eval = evaluate_candidate(params, config, config.search_max, per_iteration)?;

    let mut solved_contribution = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_eval.probability + PROBABILITY_SLACK >= config.target_probability {
        solved_contribution = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower contribution bound.".to_string();
    } else if high_eval.probability + PROBABILITY_SLACK < config.target_probability {
        feasible = false;
        message = "No feasible contribution found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            let mid = (lo + hi) * 0.5;
            // Bracket is one ulp wide; no finer candidate exists.
            if mid <= lo || mid >= hi {
                converged = true;
                break;
            }
            it += 1;
            let eval = evaluate_candidate(params, config, mid, per_iteration)?;
            iterations.push(SolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_contribution: mid,
                goal_probability: eval.probability,
                probability_ci_half_width: eval.ci_half_width,
            });

            if eval.probability + PROBABILITY_SLACK >= config.target_probability {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_contribution = Some(hi);
        feasible = true;
        message = if converged {
            "Solved required contribution.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let mut achieved_probability = None;
    let mut achieved_ci_half_width = None;
    if let Some(contribution) = solved_contribution {
        let final_eval =
            evaluate_candidate(params, config, contribution, config.final_simulations)?;
        achieved_probability = Some(final_eval.probability);
        achieved_ci_half_width = Some(final_eval.ci_half_width);
    }

    info!(
        goal = config.goal,
        target = config.target_probability,
        feasible,
        converged,
        iterations = iterations.len(),
        "contribution solve finished"
    );

    Ok(ContributionSolveResult {
        goal: config.goal,
        target_probability: config.target_probability,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        simulations_per_iteration: config.simulations_per_iteration,
        final_simulations: config.final_simulations,
        solved_contribution,
        achieved_probability,
        achieved_ci_half_width,
        iterations,
        converged,
        feasible,
        message,
    })
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    probability: f64,
    ci_half_width: f64,
}

fn evaluate_candidate(
    base: &SimulationParameters,
    config: ContributionSolveConfig,
    contribution: f64,
    simulations: u32,
) -> Result<CandidateEval> {
    let params = SimulationParameters {
        monthly_contribution: contribution,
        simulations,
        ..base.clone()
    };

    let real = project(&params)?;
    let probability = goal_probability(&real.final_values(), config.goal)?;
    Ok(CandidateEval {
        probability,
        ci_half_width: binomial_ci_half_width(probability, simulations),
    })
}

fn binomial_ci_half_width(p: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}

fn validate_config(config: ContributionSolveConfig) -> Result<()> {
    let invalid = |reason: &'static str| -> Result<()> {
        Err(SimulationError::InvalidSolverConfig(reason))
    };

    if !config.goal.is_finite() {
        return Err(SimulationError::NonFiniteGoal(config.goal));
    }
    if config.goal <= 0.0 {
        return invalid("goal must be > 0");
    }
    if !(config.target_probability > 0.0 && config.target_probability <= 1.0) {
        return invalid("target_probability must be in (0, 1]");
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return invalid("search bounds must be finite");
    }
    if config.search_max <= config.search_min {
        return invalid("search_max must be greater than search_min");
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return invalid("tolerance must be > 0");
    }
    if config.max_iterations == 0 {
        return invalid("max_iterations must be > 0");
    }
    if config.simulations_per_iteration == 0 {
        return invalid("simulations_per_iteration must be > 0");
    }
    if config.final_simulations == 0 {
        return invalid("final_simulations must be > 0");
    }
    Ok(())
}
