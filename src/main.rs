// ========================================================================================
//
//                          Command-line front end for WellAI
//
// ========================================================================================
//
// The binary is a thin shell around the library. It loads the configuration, builds the
// engine once and hands it a single submission read from a TOML file. Everything that can
// go wrong at startup (missing models, malformed configuration) is fatal; everything that
// goes wrong after validation is reported per condition by the engine itself.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Parser, Subcommand};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use wellai::ledger::{Ledger, LedgerTable};
use wellai::normalize::Probability;
use wellai::pipeline::RiskEngine;
use wellai::shared::config::AppConfig;
use wellai::types::{Condition, Submission};

// ========================================================================================
//                         Command-line interface definition
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "wellai",
    version,
    about = "Cardiovascular, stroke and diabetes risk predictions with a shared submission ledger",
    long_about = "Validates one health questionnaire, runs the three pre-trained risk models on it \
                 and appends the answers and predicted probabilities to the ledger sheet."
)]
struct Cli {
    /// Path to the WellAI configuration file
    #[arg(long, global = true, default_value = "wellai.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, predict and record one submission
    #[command(about = "Process one submission (TOML) and append it to the ledger")]
    Submit {
        /// Path to the submission TOML file
        #[arg(value_name = "SUBMISSION")]
        submission: PathBuf,
    },

    /// Summarise the rows currently stored in the ledger sheet
    #[command(about = "Print the stored ledger rows with their predictions")]
    Ledger,
}

// ========================================================================================
//                                   Entry point
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { config, command } = Cli::parse();

    let result = match command {
        Commands::Submit { submission } => run_submit(&config, &submission),
        Commands::Ledger => run_ledger(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

// ========================================================================================
//                                Subcommand handlers
// ========================================================================================

fn run_submit(config_path: &Path, submission_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load(config_path)?;
    let engine = RiskEngine::from_config(&config)?;

    let text = fs::read_to_string(submission_path)
        .map_err(|e| format!("Failed to read submission '{}': {e}", submission_path.display()))?;
    let submission: Submission = toml::from_str(&text)?;

    let report = engine.process(submission).map_err(|e| e.reprompt())?;

    for line in report.lines() {
        println!("{line}");
    }
    if let Err(e) = &report.persisted {
        return Err(format!("Predictions were not recorded: {e}").into());
    }
    Ok(())
}

fn run_ledger(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load(config_path)?;
    let ledger = Ledger::new(config.sheet_store(), config.read_ttl());
    let table = ledger.read()?;

    println!(
        "{} rows in worksheet '{}' ({})",
        table.len(),
        config.ledger.worksheet,
        ledger.store().path().display()
    );
    for row in 0..table.len() {
        println!("{}", summarise_row(&table, row));
    }
    Ok(())
}

fn summarise_row(table: &LedgerTable, row: usize) -> String {
    let name = table.cell(row, "Name").unwrap_or_default();
    let predictions: Vec<String> = Condition::ALL
        .iter()
        .map(|condition| {
            let shown = table
                .cell(row, condition.probability_column())
                .and_then(|cell| cell.parse::<f64>().ok())
                .and_then(Probability::new)
                .map_or_else(|| "n/a".to_string(), |p| p.to_string());
            format!("{} {shown}", condition.label())
        })
        .collect();
    format!("{:>4}  {name}: {}", row + 1, predictions.join(" | "))
}
