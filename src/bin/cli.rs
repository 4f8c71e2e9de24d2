//! Startup success CLI - label, prepare and score historical company data

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use startup_success::core::LabelBuilder;
use startup_success::data::{load_raw_records, write_training_table, FeatureProjector};
use startup_success::models::{RawRecord, RiskLevel, StartupProfile, SuccessEstimate};
use startup_success::{PipelineConfig, PredictionService, SchemaMetadata};

const TRAINING_TABLE_FILE: &str = "training.csv";
const SCHEMA_FILE: &str = "schema_metadata.json";

#[derive(Parser)]
#[command(name = "startup-success")]
#[command(author, version, about = "Startup success estimation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Historical dataset CSV (defaults to DATASET_PATH or data/startups.csv)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// ONNX model (defaults to MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Schema metadata JSON (defaults to METADATA_PATH)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Minimum years an operating company must have survived to count as a success
    #[arg(long)]
    min_years: Option<f64>,

    /// Log pipeline progress
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise outcome labels for the dataset
    Labels,

    /// Build the training table and schema metadata
    Prepare {
        /// Output directory for training.csv, and for schema_metadata.json unless
        /// --metadata or METADATA_PATH names the schema location
        #[arg(short, long, default_value = "models")]
        out_dir: PathBuf,
    },

    /// Show the persisted feature schema
    Schema,

    /// Estimate the success probability of one company
    Predict {
        /// Raw record as a JSON object (dataset column names)
        #[arg(long, conflicts_with_all = ["market", "country", "region", "city", "funding", "rounds"])]
        record: Option<String>,

        /// Market or category list, e.g. "Software|Analytics"
        #[arg(long)]
        market: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        city: Option<String>,

        /// Total funding in USD
        #[arg(long)]
        funding: Option<f64>,

        /// Number of funding rounds
        #[arg(long)]
        rounds: Option<u32>,
    },
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(path) = &self.dataset {
            config.dataset_path = path.clone();
        }
        if let Some(path) = &self.model {
            config.model_path = path.clone();
        }
        if let Some(path) = &self.metadata {
            config.metadata_path = path.clone();
        }
        if let Some(years) = self.min_years {
            config.min_operating_years = years;
        }
        config
    }

    /// Schema location chosen by `--metadata` or `METADATA_PATH`, if any
    fn explicit_metadata_path(&self) -> Option<PathBuf> {
        self.metadata
            .clone()
            .or_else(|| std::env::var_os("METADATA_PATH").map(PathBuf::from))
    }
}

/// Where `prepare` writes the schema: the serving location when one was
/// chosen explicitly, otherwise next to the training table
fn schema_output_path(out_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out_dir.join(SCHEMA_FILE))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::INFO } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    println!(
        "{}",
        format!("Startup Success CLI v{}", env!("CARGO_PKG_VERSION"))
            .cyan()
            .bold()
    );
    println!();

    let config = cli.pipeline_config();
    let schema_out = cli.explicit_metadata_path();

    if cli.interactive {
        run_interactive(&config, schema_out.as_deref())?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Labels => show_labels(&config)?,
            Commands::Prepare { out_dir } => prepare(&config, &out_dir, schema_out.as_deref())?,
            Commands::Schema => show_schema(&config.metadata_path)?,
            Commands::Predict {
                record,
                market,
                country,
                region,
                city,
                funding,
                rounds,
            } => {
                let record = match record {
                    Some(json) => serde_json::from_str::<RawRecord>(&json)
                        .context("--record must be a JSON object")?,
                    None => StartupProfile {
                        market,
                        country,
                        region,
                        city,
                        funding_total: funding,
                        funding_rounds: rounds,
                    }
                    .to_raw_record(),
                };
                predict(&config, &record)?;
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    Ok(pb)
}

fn load_dataset(config: &PipelineConfig) -> Result<Vec<RawRecord>> {
    let pb = spinner("Loading dataset...")?;
    let records = load_raw_records(&config.dataset_path)
        .with_context(|| format!("Failed to load dataset from {:?}", config.dataset_path))?;
    pb.finish_and_clear();
    Ok(records)
}

fn show_labels(config: &PipelineConfig) -> Result<()> {
    let records = load_dataset(config)?;
    let labels = LabelBuilder::new(config.min_operating_years)
        .context("Invalid --min-years")?
        .build(&records);
    let summary = labels.summary();

    println!("{}", "Outcome Labels:".yellow().bold());
    println!("{}", "-".repeat(40));
    println!("{:<24} {:>12}", "Records", summary.total);
    println!("{:<24} {:>12}", "Successes", summary.successes);
    println!("{:<24} {:>12}", "Failures", summary.failures);
    println!(
        "{:<24} {:>12}",
        "Unknown (too young)",
        summary.unknown.to_string().dimmed()
    );
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:>11.2}%",
        "Success rate (known)",
        summary.success_rate() * 100.0
    );
    println!(
        "{:<24} {:>12}",
        "Threshold (years)", config.min_operating_years
    );
    println!();

    Ok(())
}

fn prepare(config: &PipelineConfig, out_dir: &Path, schema_out: Option<&Path>) -> Result<()> {
    let records = load_dataset(config)?;
    let labels = LabelBuilder::new(config.min_operating_years)
        .context("Invalid --min-years")?
        .build(&records);
    let (known, success) = labels.select_known(&records);

    let pb = spinner("Projecting features...")?;
    let projection = FeatureProjector::fit(&known).context("Failed to fit feature schema")?;
    pb.finish_and_clear();

    let table_path = out_dir.join(TRAINING_TABLE_FILE);
    let schema_path = schema_output_path(out_dir, schema_out);

    write_training_table(&table_path, &projection.rows, &projection.metadata, &success)
        .with_context(|| format!("Failed to write training table to {:?}", table_path))?;
    projection
        .metadata
        .save(&schema_path)
        .with_context(|| format!("Failed to write schema metadata to {:?}", schema_path))?;

    println!("{}", "Prepared training data".green().bold());
    println!(
        "  {} of {} records kept ({} unknown outcomes dropped)",
        known.len(),
        records.len(),
        records.len() - known.len()
    );
    println!("  {} features", projection.metadata.len());
    println!("  {} {:?}", "→".green(), table_path);
    println!("  {} {:?}", "→".green(), schema_path);
    println!();

    Ok(())
}

fn show_schema(metadata_path: &Path) -> Result<()> {
    let metadata = SchemaMetadata::load(metadata_path)
        .with_context(|| format!("Failed to load schema from {:?}", metadata_path))?;

    println!("{}", "Feature Schema:".yellow().bold());
    println!("{:>4} {:<24} {:>12}", "#", "Feature", "Kind");
    println!("{}", "-".repeat(42));
    for (i, name) in metadata.feature_order().iter().enumerate() {
        let kind = if metadata.is_categorical(name) {
            "categorical".cyan()
        } else {
            "numeric".normal()
        };
        println!("{:>4} {:<24} {:>12}", i, name, kind);
    }
    println!();

    Ok(())
}

fn predict(config: &PipelineConfig, record: &RawRecord) -> Result<()> {
    let service = PredictionService::load(config).with_context(|| {
        format!(
            "Failed to load model {:?} with schema {:?}",
            config.model_path, config.metadata_path
        )
    })?;

    let estimate = service.predict(record).context("Prediction failed")?;
    print_estimate(&estimate);

    Ok(())
}

fn print_estimate(estimate: &SuccessEstimate) {
    let percent = format!("{:.1}%", estimate.success_probability_percent);
    let (percent, risk) = match estimate.risk_level {
        RiskLevel::Low => (percent.green(), estimate.risk_level.label().green()),
        RiskLevel::Moderate => (percent.yellow(), estimate.risk_level.label().yellow()),
        RiskLevel::High => (percent.red(), estimate.risk_level.label().red()),
    };

    println!("{}", "Success Estimate:".yellow().bold());
    println!("  Probability of success: {}", percent.bold());
    println!("  Risk: {}", risk);
    println!();
}

fn prompt_optional(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn run_interactive(config: &PipelineConfig, schema_out: Option<&Path>) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();

    loop {
        let options = vec![
            "Estimate a startup",
            "Label summary",
            "Prepare training data",
            "Show schema",
            "Quit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        let outcome = match selection {
            0 => {
                let market = prompt_optional(&theme, "Market (e.g. Software)")?;
                let country = prompt_optional(&theme, "Country code (e.g. USA)")?;
                let region = prompt_optional(&theme, "Region")?;
                let city = prompt_optional(&theme, "City")?;
                let funding: f64 = Input::with_theme(&theme)
                    .with_prompt("Total funding (USD)")
                    .default(0.0)
                    .interact_text()?;
                let rounds: u32 = Input::with_theme(&theme)
                    .with_prompt("Funding rounds")
                    .default(0)
                    .interact_text()?;

                let profile = StartupProfile {
                    market,
                    country,
                    region,
                    city,
                    funding_total: Some(funding.max(0.0)),
                    funding_rounds: Some(rounds),
                };
                println!();
                predict(config, &profile.to_raw_record())
            }
            1 => {
                println!();
                show_labels(config)
            }
            2 => {
                let out_dir: String = Input::with_theme(&theme)
                    .with_prompt("Output directory")
                    .default("models".to_string())
                    .interact_text()?;
                println!();
                prepare(config, Path::new(&out_dir), schema_out)
            }
            3 => {
                println!();
                show_schema(&config.metadata_path)
            }
            _ => {
                println!("Goodbye!");
                break;
            }
        };

        // Keep the session alive after a failed action
        if let Err(e) = outcome {
            println!("{} {:#}", "Error:".red().bold(), e);
            println!();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_written_next_to_table_by_default() {
        let path = schema_output_path(Path::new("out"), None);
        assert_eq!(path, Path::new("out").join(SCHEMA_FILE));
    }

    #[test]
    fn test_schema_written_where_serving_reads_it() {
        let cli = Cli::parse_from([
            "startup-success",
            "--metadata",
            "/srv/schema.json",
            "prepare",
            "--out-dir",
            "build",
        ]);
        let explicit = cli.explicit_metadata_path();
        let path = schema_output_path(Path::new("build"), explicit.as_deref());

        assert_eq!(path, PathBuf::from("/srv/schema.json"));
        assert_eq!(path, cli.pipeline_config().metadata_path);
    }
}
