//! Settle a JSON list of expenses and print the reduced graph
//!
//! Usage: `settle <expenses.json> [config.toml]`

use anyhow::{bail, Context};
use settlement_graph::{Config, Expense, SettlementEngine};

fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for the result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(expenses_path) = args.next() else {
        bail!("usage: settle <expenses.json> [config.toml]");
    };

    // Load configuration
    let mut config = match args.next() {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => Config::default(),
    };
    config.apply_env().context("invalid environment override")?;

    let raw = std::fs::read_to_string(&expenses_path)
        .with_context(|| format!("failed to read {}", expenses_path))?;
    let expenses: Vec<Expense> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse expenses from {}", expenses_path))?;

    tracing::info!("Loaded {} expenses from {}", expenses.len(), expenses_path);

    let pretty = config.output.pretty_print;
    let engine = SettlementEngine::new(config);
    let plan = engine.settle(&expenses)?;

    let output = if pretty {
        serde_json::to_string_pretty(&plan.settled)?
    } else {
        serde_json::to_string(&plan.settled)?
    };
    println!("{}", output);

    Ok(())
}
