use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

use sqlgrade::db::{ConnectionConfig, PostgresBackend, SavedConnections, SqlBackend, SqliteBackend};
use sqlgrade::eval::{Evaluation, Ledger, SolutionEvaluator};
use sqlgrade::report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Fresh in-memory SQLite database
    Sqlite,
    /// Scratch schema on a PostgreSQL server
    Postgres,
}

/// Grade SQL coursework against a weighted rubric
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Rubric JSON mapping criterion names to { maxScore, queryType }
    #[arg(long)]
    criteria: PathBuf,

    /// Solution text extracted from the submitted document
    #[arg(long)]
    solution: PathBuf,

    #[arg(long, value_enum, default_value_t = Engine::Sqlite)]
    engine: Engine,

    /// Saved connection to grade on (postgres engine only)
    #[arg(long = "connect")]
    connect: Option<String>,

    /// Connection file, defaults to <config dir>/sqlgrade/connections.toml
    #[arg(long)]
    connections: Option<PathBuf>,

    /// Also write the full evaluation as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log every statement and repair attempt
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let ledger = Ledger::load(&cli.criteria)?;
    let solution = std::fs::read_to_string(&cli.solution)
        .with_context(|| format!("Failed to read solution {}", cli.solution.display()))?
        .to_uppercase();

    let evaluation = match cli.engine {
        Engine::Sqlite => grade(SqliteBackend::open_in_memory()?, ledger, &solution).await?,
        Engine::Postgres => {
            let config = resolve_connection(&cli)?;
            tracing::info!("Connecting to {}", config.display_string());
            let backend = PostgresBackend::connect(&config).await?;
            grade(backend, ledger, &solution).await?
        }
    };

    println!();
    print!("{}", report::score_table(&evaluation.ledger));
    println!();
    print!("{}", report::statistics(&evaluation));

    if !evaluation.model.is_empty() {
        println!("\nRelational model:");
        print!("{}", evaluation.model);
    }
    if !evaluation.errors.is_empty() {
        println!("\nUnrecoverable errors:");
        print!("{}", report::errors(&evaluation));
    }

    if let Some(path) = &cli.json {
        std::fs::write(path, report::to_json(&evaluation))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

async fn grade<B: SqlBackend>(backend: B, ledger: Ledger, solution: &str) -> Result<Evaluation> {
    let mut evaluator = SolutionEvaluator::new(backend);
    Ok(evaluator.evaluate(ledger, solution).await?)
}

fn resolve_connection(cli: &Cli) -> Result<ConnectionConfig> {
    let mut config = match &cli.connect {
        Some(name) => {
            let path = cli
                .connections
                .clone()
                .unwrap_or_else(SavedConnections::default_path);
            let saved = SavedConnections::load(&path)?;
            match saved.find(name) {
                Some(config) => config.clone(),
                None => {
                    let names: Vec<&str> = saved.connections.iter().map(|c| c.name.as_str()).collect();
                    bail!(
                        "No saved connection named {:?} in {} (saved: {})",
                        name,
                        path.display(),
                        names.join(", ")
                    );
                }
            }
        }
        None => ConnectionConfig::default(),
    };

    config.resolve_password()?;
    Ok(config)
}
