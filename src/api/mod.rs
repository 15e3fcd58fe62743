use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    ContributionSolveConfig, ContributionSolveResult, OutcomeSummary, Scenario,
    SimulationParameters, simulate, solve_required_contribution,
};

const MAX_YEARS: u32 = 100;
const MAX_SIMULATIONS: u32 = 100_000;
const MAX_SAMPLE_PATHS: usize = 500;
const MAX_SOLVER_ITERATIONS: u32 = 200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliScenario {
    Cautious,
    Balanced,
    Aggressive,
}

impl From<CliScenario> for Scenario {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::Cautious => Scenario::Cautious,
            CliScenario::Balanced => Scenario::Balanced,
            CliScenario::Aggressive => Scenario::Aggressive,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiScenario {
    #[serde(alias = "Cautious")]
    Cautious,
    #[serde(alias = "Balanced")]
    Balanced,
    #[serde(alias = "Aggressive")]
    Aggressive,
}

impl From<ApiScenario> for CliScenario {
    fn from(value: ApiScenario) -> Self {
        match value {
            ApiScenario::Cautious => CliScenario::Cautious,
            ApiScenario::Balanced => CliScenario::Balanced,
            ApiScenario::Aggressive => CliScenario::Aggressive,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "riskwise",
    about = "Monte Carlo projection of a monthly savings plan in inflation-adjusted terms"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, env = "RISKWISE_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection and print the JSON result
    Simulate(SimulateArgs),
    /// Find the monthly contribution needed to reach the goal
    Solve {
        #[command(flatten)]
        simulation: SimulateArgs,
        #[command(flatten)]
        solver: SolverArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(
        long,
        value_enum,
        default_value_t = CliScenario::Balanced,
        help = "Market preset supplying return and volatility"
    )]
    pub scenario: CliScenario,
    #[arg(long, default_value_t = 10, help = "Investment horizon in years")]
    pub years: u32,
    #[arg(long, default_value_t = 1000.0)]
    pub start_balance: f64,
    #[arg(long, default_value_t = 200.0)]
    pub monthly_contribution: f64,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, overrides the scenario"
    )]
    pub expected_return: Option<f64>,
    #[arg(long, help = "Annual return volatility in percent, overrides the scenario")]
    pub volatility: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = 2.0,
        help = "Expected annual inflation in percent"
    )]
    pub inflation_rate: f64,
    #[arg(long, default_value_t = 2000)]
    pub simulations: u32,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = 0.0,
        help = "Savings goal in today's money; 0 means no goal"
    )]
    pub goal: f64,
    #[arg(
        long,
        default_value_t = 60,
        help = "Number of real-terms paths to include in the output"
    )]
    pub sample_paths: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SolverArgs {
    #[arg(
        long,
        default_value_t = 90.0,
        help = "Required probability of reaching the goal in percent"
    )]
    pub target_probability: f64,
    #[arg(long, default_value_t = 0.0)]
    pub search_min: f64,
    #[arg(long, default_value_t = 5000.0)]
    pub search_max: f64,
    #[arg(long, default_value_t = 1.0, help = "Stop once the bracket is this narrow")]
    pub tolerance: f64,
    #[arg(long, default_value_t = 40)]
    pub max_iterations: u32,
    #[arg(long, default_value_t = 1000)]
    pub simulations_per_iteration: u32,
    #[arg(long, default_value_t = 5000)]
    pub final_simulations: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    scenario: Option<ApiScenario>,
    years: Option<u32>,
    start_balance: Option<f64>,
    monthly_contribution: Option<f64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    inflation_rate: Option<f64>,
    simulations: Option<u32>,
    seed: Option<u64>,
    goal: Option<f64>,
    sample_paths: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    simulation: SimulatePayload,
    target_probability: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
    simulations_per_iteration: Option<u32>,
    final_simulations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    scenario: Scenario,
    years: u32,
    months: usize,
    simulations: u32,
    seed: u64,
    start_balance: f64,
    monthly_contribution: f64,
    expected_return_annual: f64,
    volatility_annual: f64,
    inflation_annual: f64,
    goal: f64,
    summary: OutcomeSummary,
    spread: f64,
    final_values: Vec<f64>,
    sample_paths: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioResponse {
    name: Scenario,
    expected_return_annual: f64,
    volatility_annual: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(args: &SimulateArgs) -> Result<SimulationParameters, String> {
    if args.years == 0 || args.years > MAX_YEARS {
        return Err(format!("--years must be between 1 and {MAX_YEARS}"));
    }

    if args.simulations == 0 || args.simulations > MAX_SIMULATIONS {
        return Err(format!(
            "--simulations must be between 1 and {MAX_SIMULATIONS}"
        ));
    }

    if !args.start_balance.is_finite() || args.start_balance < 0.0 {
        return Err("--start-balance must be >= 0".to_string());
    }

    if !args.monthly_contribution.is_finite() {
        return Err("--monthly-contribution must be a finite number".to_string());
    }

    if let Some(v) = args.expected_return {
        if !v.is_finite() {
            return Err("--expected-return must be a finite number".to_string());
        }
    }

    if let Some(v) = args.volatility {
        if !v.is_finite() || v < 0.0 {
            return Err("--volatility must be >= 0".to_string());
        }
    }

    if !args.inflation_rate.is_finite() || args.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }

    if !args.goal.is_finite() {
        return Err("--goal must be a finite number".to_string());
    }

    if args.sample_paths > MAX_SAMPLE_PATHS {
        return Err(format!("--sample-paths must be <= {MAX_SAMPLE_PATHS}"));
    }

    let scenario = Scenario::from(args.scenario);
    let params = SimulationParameters {
        years: args.years,
        start_balance: args.start_balance,
        monthly_contribution: args.monthly_contribution,
        expected_return_annual: args
            .expected_return
            .map(|v| v / 100.0)
            .unwrap_or(scenario.expected_return_annual()),
        volatility_annual: args
            .volatility
            .map(|v| v / 100.0)
            .unwrap_or(scenario.volatility_annual()),
        inflation_annual: args.inflation_rate / 100.0,
        simulations: args.simulations,
        seed: args.seed,
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

fn build_solver_config(goal: f64, solver: &SolverArgs) -> Result<ContributionSolveConfig, String> {
    if goal <= 0.0 {
        return Err("--goal must be > 0 when solving for a contribution".to_string());
    }

    if !(0.0..=100.0).contains(&solver.target_probability) || solver.target_probability == 0.0 {
        return Err("--target-probability must be in (0, 100]".to_string());
    }

    if solver.max_iterations == 0 || solver.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(format!(
            "--max-iterations must be between 1 and {MAX_SOLVER_ITERATIONS}"
        ));
    }

    if solver.simulations_per_iteration > MAX_SIMULATIONS
        || solver.final_simulations > MAX_SIMULATIONS
    {
        return Err(format!(
            "solver simulation counts must be <= {MAX_SIMULATIONS}"
        ));
    }

    Ok(ContributionSolveConfig {
        goal,
        target_probability: solver.target_probability / 100.0,
        search_min: solver.search_min,
        search_max: solver.search_max,
        tolerance: solver.tolerance,
        max_iterations: solver.max_iterations,
        simulations_per_iteration: solver.simulations_per_iteration,
        final_simulations: solver.final_simulations,
    })
}

pub fn run_simulation(args: &SimulateArgs) -> Result<SimulateResponse, String> {
    let params = build_params(args)?;
    let projection = simulate(&params, args.goal).map_err(|e| e.to_string())?;

    Ok(SimulateResponse {
        scenario: args.scenario.into(),
        years: params.years,
        months: params.months(),
        simulations: params.simulations,
        seed: params.seed,
        start_balance: params.start_balance,
        monthly_contribution: params.monthly_contribution,
        expected_return_annual: params.expected_return_annual,
        volatility_annual: params.volatility_annual,
        inflation_annual: params.inflation_annual,
        goal: args.goal,
        summary: projection.summary,
        spread: projection.summary.spread(),
        final_values: projection.final_values(),
        sample_paths: projection.sample_paths(args.sample_paths),
    })
}

pub fn run_solve(
    simulation: &SimulateArgs,
    solver: &SolverArgs,
) -> Result<ContributionSolveResult, String> {
    let params = build_params(simulation)?;
    let config = build_solver_config(simulation.goal, solver)?;
    solve_required_contribution(&params, config).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .route("/api/scenarios", get(scenarios_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("RiskWise HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn scenarios_handler() -> Response {
    let scenarios = Scenario::ALL
        .iter()
        .map(|&scenario| ScenarioResponse {
            name: scenario,
            expected_return_annual: scenario.expected_return_annual(),
            volatility_annual: scenario.volatility_annual(),
        })
        .collect::<Vec<_>>();
    json_response(StatusCode::OK, scenarios)
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let mut args = default_simulate_args();
    apply_simulate_payload(&mut args, payload);
    respond_blocking(move || run_simulation(&args)).await
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let (simulation, solver) = solve_args_from_payload(payload);
    respond_blocking(move || run_solve(&simulation, &solver)).await
}

async fn respond_blocking<T, F>(work: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(body)) => json_response(StatusCode::OK, body),
        Ok(Err(msg)) => {
            warn!(error = %msg, "rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
        Err(e) => {
            warn!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn default_simulate_args() -> SimulateArgs {
    SimulateArgs {
        scenario: CliScenario::Balanced,
        years: 10,
        start_balance: 1_000.0,
        monthly_contribution: 200.0,
        expected_return: None,
        volatility: None,
        inflation_rate: 2.0,
        simulations: 2_000,
        seed: 42,
        goal: 0.0,
        sample_paths: 60,
    }
}

fn default_solver_args() -> SolverArgs {
    SolverArgs {
        target_probability: 90.0,
        search_min: 0.0,
        search_max: 5_000.0,
        tolerance: 1.0,
        max_iterations: 40,
        simulations_per_iteration: 1_000,
        final_simulations: 5_000,
    }
}

fn apply_simulate_payload(args: &mut SimulateArgs, payload: SimulatePayload) {
    if let Some(v) = payload.scenario {
        args.scenario = v.into();
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.start_balance {
        args.start_balance = v;
    }
    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = Some(v);
    }
    if let Some(v) = payload.volatility {
        args.volatility = Some(v);
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.simulations {
        args.simulations = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.goal {
        args.goal = v;
    }
    if let Some(v) = payload.sample_paths {
        args.sample_paths = v;
    }
}

fn solve_args_from_payload(payload: SolvePayload) -> (SimulateArgs, SolverArgs) {
    let mut simulation = default_simulate_args();
    apply_simulate_payload(&mut simulation, payload.simulation);

    let mut solver = default_solver_args();
    if let Some(v) = payload.target_probability {
        solver.target_probability = v;
    }
    if let Some(v) = payload.search_min {
        solver.search_min = v;
    }
    if let Some(v) = payload.search_max {
        solver.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        solver.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        solver.max_iterations = v;
    }
    if let Some(v) = payload.simulations_per_iteration {
        solver.simulations_per_iteration = v;
    }
    if let Some(v) = payload.final_simulations {
        solver.final_simulations = v;
    }

    (simulation, solver)
}
