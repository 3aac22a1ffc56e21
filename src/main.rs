// Provider Risk CLI
// Thin driver over the library: template, live check, bulk analysis, health

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use provider_risk::{
    format_probability, generate_template, top_factors, BulkSession, ClientConfig, Feature,
    LiveCheckSession, PredictionClient, DISPLAY_FACTORS,
};

#[derive(Parser, Debug)]
#[command(name = "provider-risk")]
#[command(about = "Healthcare provider fraud-risk client")]
#[command(version)]
struct Args {
    /// TOML config file (base_url, timeout_secs, retries)
    #[arg(short, long, env = "PROVIDER_RISK_CONFIG")]
    config: Option<PathBuf>,

    /// Scoring service root URL (overrides the config file)
    #[arg(long, env = "PROVIDER_RISK_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the CSV upload template
    Template {
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Score a single provider
    Check {
        /// Feature value as NAME=VALUE (repeatable, unset features are 0)
        #[arg(short, long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },
    /// Score every provider in a CSV file
    Bulk {
        file: PathBuf,
        /// Write the results CSV here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Ping the scoring service
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provider_risk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Template { out } => write_template(out),
        Command::Check { fields } => {
            let client = build_client(args.config, args.base_url)?;
            run_check(client, &fields).await
        }
        Command::Bulk { file, out } => {
            let client = build_client(args.config, args.base_url)?;
            run_bulk(client, file, out).await
        }
        Command::Health => {
            let client = build_client(args.config, args.base_url)?;
            let message = client.health().await.context("Health check failed")?;
            println!("✓ {}", message);
            Ok(())
        }
    }
}

fn build_client(config_path: Option<PathBuf>, base_url: Option<String>) -> Result<PredictionClient> {
    let mut config = match config_path {
        Some(path) => ClientConfig::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = base_url {
        config = config.with_base_url(url);
    }

    tracing::debug!(base_url = %config.base_url, "Using scoring service");
    PredictionClient::new(config).context("Failed to build HTTP client")
}

fn write_template(out: Option<PathBuf>) -> Result<()> {
    let template = generate_template();
    match out {
        Some(path) => {
            std::fs::write(&path, template)
                .with_context(|| format!("Failed to write template: {}", path.display()))?;
            println!("✓ Template written to {}", path.display());
        }
        None => print!("{}", template),
    }
    Ok(())
}

/// Split "NAME=VALUE" pairs; unknown names are rejected up front
fn parse_field_args(fields: &[String]) -> Result<Vec<(&str, &str)>> {
    fields
        .iter()
        .map(|arg| {
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected NAME=VALUE, got {:?}", arg))?;
            if Feature::from_header(name).is_none() {
                let known: Vec<String> = Feature::ALL
                    .iter()
                    .map(|f| format!("  {} ({})", f.name(), f.label()))
                    .collect();
                return Err(anyhow!("Unknown feature {:?}, expected one of:\n{}", name, known.join("\n")));
            }
            Ok((name, value))
        })
        .collect()
}

async fn run_check(client: PredictionClient, fields: &[String]) -> Result<()> {
    let pairs = parse_field_args(fields)?;
    let session = LiveCheckSession::new(client);

    println!("🔍 Analyzing provider...");
    let outcome = session
        .submit_form(pairs)
        .await
        .context("Live check failed, nothing was scored")?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Prediction:        {}", outcome.classification);
    println!("Fraud probability: {}", format_probability(outcome.response.probability));
    println!("Risk level:        {}", outcome.bucket);
    println!("\nKey factors (SHAP, base value {:.4}):", outcome.response.base_value);
    for factor in top_factors(&outcome.factors, DISPLAY_FACTORS) {
        println!("  • {}", factor);
    }
    Ok(())
}

async fn run_bulk(client: PredictionClient, file: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let session = BulkSession::new(client);

    println!("📂 Uploading {}...", file.display());
    let outcome = session
        .analyze_file(&file)
        .await
        .with_context(|| format!("Bulk analysis of {} failed", file.display()))?;

    let summary = &outcome.result.summary;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ {}", summary.summary());
    println!(
        "  High risk: {}  Medium risk: {}  Low risk: {}",
        outcome.distribution.high, outcome.distribution.medium, outcome.distribution.low
    );

    let results = session.export()?;
    match out {
        Some(path) => {
            std::fs::write(&path, results)
                .with_context(|| format!("Failed to write results: {}", path.display()))?;
            println!("✓ Results written to {}", path.display());
        }
        None => print!("\n{}", results),
    }
    Ok(())
}
