//! transship-runner: headless runner for one transfer problem.
//!
//! Usage:
//!   transship-runner --problem data/transfer_problem.json
//!   transship-runner --problem data/transfer_problem.json --config data/config.json --seed 12345 --output report.json

use anyhow::{Context, Result};
use std::env;
use transship_core::{
    config::TransshipConfig,
    engine::{RunReport, TransshipEngine},
    event::RunEvent,
    product::TransferProblem,
};

#[derive(serde::Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    #[serde(flatten)]
    report:       &'a RunReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let problem_path = str_arg(&args, "--problem").unwrap_or("./data/transfer_problem.json");
    let config_path = str_arg(&args, "--config");
    let output_path = str_arg(&args, "--output");

    let mut config = match config_path {
        Some(path) => TransshipConfig::load(path)?,
        None => TransshipConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);

    println!("transship-runner");
    println!("  problem:   {problem_path}");
    println!("  config:    {}", config_path.unwrap_or("(defaults)"));
    println!("  seed:      {}", config.seed);
    println!();

    let payload = std::fs::read_to_string(problem_path)
        .with_context(|| format!("Cannot read {problem_path}"))?;
    let problem = TransferProblem::from_json_str(&payload)
        .with_context(|| format!("Cannot parse {problem_path}"))?;

    let mut engine = TransshipEngine::new(config);
    let report = engine.run(&problem)?;
    print_summary(&report);

    if let Some(path) = output_path {
        let file = ReportFile {
            generated_at: chrono::Utc::now().to_rfc3339(),
            report:       &report,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)
            .with_context(|| format!("Cannot write {path}"))?;
        log::info!("report written to {path}");
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let count = |pred: fn(&RunEvent) -> bool| report.events.iter().filter(|e| pred(e)).count();
    let skipped = count(|e| matches!(e, RunEvent::ProductSkipped { .. }));
    let ineligible = count(|e| matches!(e, RunEvent::ProductIneligible { .. }));

    println!("=== RUN SUMMARY ===");
    println!("  execution:      {}", report.execution_id);
    println!("  route:          {} -> {}", report.origin_warehouse, report.destination_warehouse);
    println!("  products:       {}", report.allocation.len());
    println!("  skipped:        {skipped}");
    println!("  ineligible:     {ineligible}");
    println!("  left behind:    {}", report.allocation.left_behind.len());
    println!("  expected cost:  {:.2}", report.allocation.expected_cost);

    println!();
    println!("=== TRANSFERS ===");
    if report.allocation.is_empty() {
        println!("  (nothing to transfer)");
    }
    for (sku, quantity) in &report.allocation.quantities {
        println!("  {sku:<16} {quantity:>8}");
    }
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
