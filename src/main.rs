use clap::Parser;
use serde::Serialize;

use riskwise::api::{Cli, Command, run_http_server, run_simulation, run_solve};

#[tokio::main]
async fn main() {
    riskwise::logging::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Simulate(args) => run_simulation(&args).and_then(|r| print_json(&r)),
        Command::Solve { simulation, solver } => {
            run_solve(&simulation, &solver).and_then(|r| print_json(&r))
        }
    };

    if let Err(msg) = outcome {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("Serialize error: {e}"))?;
    println!("{json}");
    Ok(())
}
