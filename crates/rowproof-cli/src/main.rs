use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rowproof_core::{Manifest, SuiteConfig, ValidatorSettings, DEFAULT_DATE_FORMAT};
use rowproof_executor::{mask_connection_url, PostgresExecutor, SqlExecutor};
use rowproof_runner::{print_aggregate, print_suite_run, run_suite, SuiteRunner};

/// rowproof - verify that tabular data landed correctly in a database
#[derive(Parser)]
#[command(name = "rowproof")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one data file against one suite config
    Run {
        /// Suite config (YAML, TOML or JSON)
        config: PathBuf,

        /// Database connection URL (overrides DATABASE_URL and the config)
        #[arg(long)]
        db_url: Option<String>,

        /// Report file (default: reporting.output_file or validation_results.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// strftime format for `date` conversions
        #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
        date_format: String,

        /// strftime format for `datetime` conversions (default: the date format)
        #[arg(long)]
        datetime_format: Option<String>,
    },

    /// Run the suites listed in a test manifest
    Suites {
        /// Test manifest (YAML, TOML or JSON)
        manifest: PathBuf,

        /// Database connection URL (overrides DATABASE_URL and the manifest)
        #[arg(long)]
        db_url: Option<String>,

        /// Only run the named suite (repeatable)
        #[arg(long = "suite")]
        suites: Vec<String>,

        /// Only run suites carrying one of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let outcome = match cli.command {
        Commands::Run {
            config,
            db_url,
            output,
            date_format,
            datetime_format,
        } => {
            let settings = ValidatorSettings {
                date_format,
                datetime_format,
                ..ValidatorSettings::default()
            };
            run_command(&config, db_url, output, settings).await
        }
        Commands::Suites {
            manifest,
            db_url,
            suites,
            tags,
        } => suites_command(&manifest, db_url, &suites, &tags).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\n{} {:#}", "✗ Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Flag, then `DATABASE_URL`, then the config file
fn connection_url(flag: Option<String>, configured: Option<&str>) -> Option<String> {
    flag.or_else(|| std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()))
        .or_else(|| configured.map(str::to_string))
}

async fn connect(url: &str) -> Result<Arc<dyn SqlExecutor>> {
    tracing::info!("connecting to {}", mask_connection_url(url));
    let executor = PostgresExecutor::from_url(url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(
        host = executor.host(),
        port = executor.port(),
        database = executor.database(),
        "connected"
    );
    Ok(Arc::new(executor))
}

/// Run command - validate one suite config
async fn run_command(
    config_path: &Path,
    db_url: Option<String>,
    output: Option<PathBuf>,
    settings: ValidatorSettings,
) -> Result<bool> {
    let config = SuiteConfig::from_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    println!("{} {}", "Loaded configuration from".cyan(), config_path.display());
    println!("  Data file:   {}", config.data_file().display());
    println!("  Validations: {}", config.validations.len());

    let url = connection_url(db_url, config.database.connection_url.as_deref()).ok_or_else(|| {
        anyhow::anyhow!("Database connection URL required (--db-url, DATABASE_URL or database.connection_url)")
    })?;
    let executor = connect(&url).await?;

    let report_file = output
        .or_else(|| config.reporting.output_file.clone())
        .unwrap_or_else(|| PathBuf::from("validation_results.json"));
    let name = config_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("suite")
        .to_string();

    let run = run_suite(&name, &config, executor, &settings, &report_file).await?;
    print_suite_run(&run);

    Ok(run.passed())
}

/// Suites command - run every selected suite of a manifest
async fn suites_command(
    manifest_path: &Path,
    db_url: Option<String>,
    suites: &[String],
    tags: &[String],
) -> Result<bool> {
    let manifest = Manifest::from_file(manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    println!(
        "{} {}",
        "Running test manifest".cyan(),
        manifest.name.as_deref().unwrap_or(&manifest_path.display().to_string())
    );

    let url = connection_url(db_url, manifest.database.connection_url.as_deref()).ok_or_else(|| {
        anyhow::anyhow!("Database connection URL required (--db-url, DATABASE_URL or database.connection_url)")
    })?;
    let executor = connect(&url).await?;

    let mut runner = SuiteRunner::new(manifest, executor);
    let all_passed = runner.run_all(suites, tags).await?;

    for run in runner.runs() {
        print_suite_run(run);
    }
    if !runner.aggregate().suite_results().is_empty() {
        print_aggregate(runner.aggregate(), &runner.aggregate_report_path());
    } else {
        println!("{}", "No test suites to run (all disabled or filtered out)".yellow());
    }

    Ok(all_passed)
}
