//! Hobart CLI binary.
//!
//! Provides a command-line interface for ingesting SEC filings, training
//! industry growth models and forecasting registrants.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hobart::{FilingQuery, FilingStore, ForecastConfig, ForecastEngine, SqliteStore, TrainedForecast};
use hobart_data::edgar::EdgarClient;
use hobart_data::snapshot;
use hobart_forecast::{CASH_FLOW_QUANTITIES, CashFlowBase, project_cash_flow, select_input_quantities};
use indicatif::{ProgressBar, ProgressStyle};
use integration::ingest::ingest_companies;
use integration::store_manager::{
    default_model_path, default_store_path, ensure_parent, open_store, print_store_info, resolve,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: Industry growth forecasting from SEC filings", long_about = None)]
#[command(version)]
struct Cli {
    /// Filing store path (defaults to the platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download registrants from EDGAR into the filing store
    Ingest {
        /// Central Index Keys to download
        #[arg(required = true)]
        ciks: Vec<u64>,

        /// Minimum milliseconds between EDGAR requests
        #[arg(long, default_value = "100")]
        interval_ms: u64,
    },

    /// Show the most commonly reported tags of an industry
    Tags {
        /// Standard Industrial Classification code
        sic: u32,

        /// Number of tags to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Train an industry model
    Train {
        /// Standard Industrial Classification code
        sic: u32,

        /// First filing date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last filing date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Quantities to forecast
        #[arg(long, value_delimiter = ',', default_value = "Revenues")]
        outputs: Vec<String>,

        /// Forecast the cash flow components instead of --outputs
        #[arg(long)]
        cash_flow: bool,

        /// Input quantities (defaults to the industry's most common tags)
        #[arg(long, value_delimiter = ',')]
        inputs: Option<Vec<String>>,

        /// Number of common tags to use as inputs when --inputs is absent
        #[arg(long, default_value = "15")]
        input_count: usize,

        /// Minimum fraction of inputs a filing must report
        #[arg(long, default_value = "0.9")]
        confidence: f64,

        /// Engine configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to save the trained model
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Forecast growth from each registrant's latest filing
    Predict {
        /// Trained model
        #[arg(long)]
        model: PathBuf,

        /// Central Index Keys to forecast
        #[arg(required = true)]
        ciks: Vec<u64>,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Project next-period free cash flow for a registrant
    Value {
        /// Trained cash flow model
        #[arg(long)]
        model: PathBuf,

        /// Central Index Key
        cik: u64,

        /// Current revenue
        #[arg(long)]
        revenue: f64,

        /// Current costs and expenses
        #[arg(long)]
        costs: f64,

        /// Current taxes
        #[arg(long)]
        taxes: f64,

        /// Current net investments
        #[arg(long)]
        net_investments: f64,

        /// Current assets
        #[arg(long)]
        assets: f64,

        /// Current liabilities
        #[arg(long)]
        liabilities: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show filing store contents
    Info,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store_path = resolve(cli.store, default_store_path);

    match cli.command {
        Commands::Ingest { ciks, interval_ms } => {
            let store = open_store(&store_path)?;
            ingest(&store, &ciks, Duration::from_millis(interval_ms)).await?;
            print_store_info(&store_path, &store)?;
        }
        Commands::Tags { sic, limit } => {
            let store = open_store(&store_path)?;
            list_tags(&store, sic, limit)?;
        }
        Commands::Train {
            sic,
            start,
            end,
            outputs,
            cash_flow,
            inputs,
            input_count,
            confidence,
            config,
            model,
        } => {
            let store = open_store(&store_path)?;
            let config = match config {
                Some(path) => ForecastConfig::from_json_file(path)?,
                None => ForecastConfig::default(),
            };
            let outputs = if cash_flow {
                CASH_FLOW_QUANTITIES.iter().map(|s| s.to_string()).collect()
            } else {
                outputs
            };
            let inputs = match inputs {
                Some(inputs) => inputs,
                None => select_input_quantities(&store, sic, input_count)?,
            };
            let query = FilingQuery::new(sic, start, end)?;
            let model_path = resolve(model, || default_model_path(sic));

            train(&store, &query, inputs, outputs, config, confidence, &model_path)?;
        }
        Commands::Predict {
            model,
            ciks,
            format,
        } => {
            let store = open_store(&store_path)?;
            predict(&store, &model, &ciks, &format)?;
        }
        Commands::Value {
            model,
            cik,
            revenue,
            costs,
            taxes,
            net_investments,
            assets,
            liabilities,
            format,
        } => {
            let store = open_store(&store_path)?;
            let base = CashFlowBase {
                revenue,
                costs,
                taxes,
                net_investments,
                assets,
                liabilities,
            };
            value(&store, &model, cik, &base, &format)?;
        }
        Commands::Info => {
            let store = open_store(&store_path)?;
            println!("\nFiling store:");
            print_store_info(&store_path, &store)?;
        }
    }

    Ok(())
}

async fn ingest(
    store: &SqliteStore,
    ciks: &[u64],
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = EdgarClient::with_rate_limit(interval)?;

    let pb = ProgressBar::new(ciks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let summary = ingest_companies(&client, store, ciks, Some(&pb)).await;
    pb.finish_with_message(format!(
        "Stored {} companies ({} filings)",
        summary.companies, summary.filings
    ));

    if !summary.failures.is_empty() {
        eprintln!("\n{} companies failed:", summary.failures.len());
        for failure in &summary.failures {
            eprintln!("  {}", failure);
        }
    }
    if summary.companies == 0 {
        return Err("No companies were ingested".into());
    }

    Ok(())
}

fn list_tags(store: &SqliteStore, sic: u32, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let tags = store.most_common_tags(sic, limit)?;
    if tags.is_empty() {
        println!("No filings stored for SIC {:04}", sic);
        return Ok(());
    }

    println!("\nMost common tags for SIC {:04}:\n", sic);
    println!("{:<4} {:<60} {}", "#", "Tag", "Label");
    println!("{}", "-".repeat(100));
    for (rank, tag) in tags.iter().enumerate() {
        println!(
            "{:<4} {:<60} {}",
            rank + 1,
            tag.name,
            tag.label.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn train(
    store: &SqliteStore,
    query: &FilingQuery,
    inputs: Vec<String>,
    outputs: Vec<String>,
    config: ForecastConfig,
    confidence: f64,
    model_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nTraining SIC {:04} on filings {} to {}", query.sic, query.start, query.end);
    println!("  Inputs ({}): {}", inputs.len(), inputs.join(", "));
    println!("  Outputs ({}): {}", outputs.len(), outputs.join(", "));

    let mut engine = ForecastEngine::new(inputs, outputs, config)?;
    let outcome = engine.train_industry(store, query, confidence)?;

    println!(
        "  Used {} of {} consecutive filing pairs",
        outcome.used.len(),
        outcome.candidates
    );

    ensure_parent(model_path)?;
    TrainedForecast::new(engine, outcome.model)?.save(model_path)?;
    info!(path = %model_path.display(), "Saved model");
    println!("  Model saved to {}", model_path.display());

    Ok(())
}

fn predict(
    store: &SqliteStore,
    model_path: &Path,
    ciks: &[u64],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let trained = TrainedForecast::load(model_path)?;
    let outputs = trained.engine.output_quantities().to_vec();

    let mut rows = Vec::with_capacity(ciks.len());
    for &cik in ciks {
        let Some(filing) = store.latest_filing(cik)? else {
            eprintln!("Warning: No filings stored for CIK {}", cik);
            continue;
        };
        let latest = snapshot(store, filing, trained.engine.input_quantities())?;
        let growth = trained.predict(&latest)?;
        rows.push((cik, latest.filing, growth));
    }

    match format {
        "json" => {
            let forecasts: Vec<_> = rows
                .iter()
                .map(|(cik, filing, growth)| {
                    let growth: serde_json::Map<_, _> = outputs
                        .iter()
                        .cloned()
                        .zip(growth.iter().map(|g| json!(g)))
                        .collect();
                    json!({
                        "cik": cik,
                        "accession": filing.accession,
                        "filed": filing.filed.to_string(),
                        "growth": growth,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&forecasts)?);
        }
        "csv" => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            let mut header = vec!["cik".to_string(), "accession".to_string(), "filed".to_string()];
            header.extend(outputs.iter().cloned());
            writer.write_record(&header)?;

            for (cik, filing, growth) in &rows {
                let mut record = vec![cik.to_string(), filing.accession.clone(), filing.filed.to_string()];
                record.extend(growth.iter().map(|g| g.to_string()));
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        other => return Err(format!("Unknown output format: {}", other).into()),
    }

    Ok(())
}

fn value(
    store: &SqliteStore,
    model_path: &Path,
    cik: u64,
    base: &CashFlowBase,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let trained = TrainedForecast::load(model_path)?;
    let projection = project_cash_flow(&trained.engine, &trained.model, store, cik, base)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&projection)?);
        return Ok(());
    }

    println!("\nCash flow projection for CIK {}:\n", cik);
    let lines = [
        ("Revenue", base.revenue, projection.revenue),
        ("Costs and expenses", base.costs, projection.costs),
        ("Taxes", base.taxes, projection.taxes),
        ("Net investments", base.net_investments, projection.net_investments),
        ("Current assets", base.assets, projection.assets),
        ("Current liabilities", base.liabilities, projection.liabilities),
    ];
    println!("{:<24} {:>18} {:>18}", "", "Current", "Projected");
    println!("{}", "-".repeat(62));
    for (label, current, projected) in lines {
        println!("{:<24} {:>18.2} {:>18.2}", label, current, projected);
    }
    println!("{}", "-".repeat(62));
    println!("{:<24} {:>18} {:>18.2}", "Free cash flow", "", projection.free_cash_flow);

    Ok(())
}
