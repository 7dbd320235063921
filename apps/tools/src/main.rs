use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_core::{
    csv::parse_hospitals, hospitals_to_geojson, source_for_location, HospitalSource,
};
use shared::domain::HospitalRecord;
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print record, fallback and country counts for a hospital table.
    Inspect {
        /// `http(s)://` URL or file path.
        #[arg(long)]
        source: String,
    },
    /// Write the GeoJSON projection of a hospital table.
    Geojson {
        #[arg(long)]
        source: String,
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn countries(records: &[HospitalRecord]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let country = if record.country.is_empty() {
            "(unknown)"
        } else {
            record.country.as_str()
        };
        *counts.entry(country).or_insert(0) += 1;
    }
    counts
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { source } => {
            let text = source_for_location(&source)
                .fetch()
                .await
                .with_context(|| format!("failed to fetch {source}"))?;
            let parsed = parse_hospitals(&text).context("failed to parse hospital table")?;

            println!("records: {}", parsed.records.len());
            println!("skipped rows: {}", parsed.skipped_rows);
            println!("duplicate ids: {}", parsed.duplicate_ids);
            println!("defaulted fields: {}", parsed.fallbacks.len());
            for fallback in &parsed.fallbacks {
                println!(
                    "  [{}] line {} {}: {:?} -> 0",
                    fallback.code().as_str(),
                    fallback.line,
                    fallback.column,
                    fallback.raw
                );
            }
            println!("countries:");
            for (country, count) in countries(&parsed.records) {
                println!("  {country}: {count}");
            }
        }
        Command::Geojson { source, output } => {
            let text = source_for_location(&source)
                .fetch()
                .await
                .with_context(|| format!("failed to fetch {source}"))?;
            let parsed = parse_hospitals(&text).context("failed to parse hospital table")?;
            let collection = hospitals_to_geojson(&parsed.records);
            let json = serde_json::to_string_pretty(&collection)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(features = collection.len(), path = %path.display(), "geojson written");
                    println!("wrote {} features to {}", collection.len(), path.display());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}
