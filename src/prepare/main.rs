//! Raw Parks export to cleaned dataset CSV.
//!
//! Normalizes column names, coerces coordinates to numbers, drops rows
//! without them, and fills in the borough from the property id when the
//! export does not carry one.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courtside::models::Borough;
use courtside::store::parse_capacity;

/// Column order of the cleaned CSV
const CLEAN_COLUMNS: [&str; 7] = [
    "Court_Id",
    "Name",
    "Borough",
    "Location",
    "Num_Of_Courts",
    "Lat",
    "Lon",
];

#[derive(Parser, Debug)]
#[command(name = "prepare")]
#[command(about = "Clean a raw NYC Parks JSON export into a dataset CSV")]
struct Args {
    /// Raw JSON export (array of objects)
    #[arg(short, long)]
    input: PathBuf,

    /// Cleaned CSV to write
    #[arg(short, long)]
    output: PathBuf,

    /// Rebuild even if the output already exists
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.output.exists() && !args.force {
        info!(
            "{} already exists, skipping (use --force to rebuild)",
            args.output.display()
        );
        return Ok(());
    }

    let rows = build_clean_csv(&args.input, &args.output)?;
    info!("Cleaned data written with {} records", rows);

    Ok(())
}

/// One row of the cleaned table
#[derive(Debug, PartialEq)]
struct CleanRow {
    court_id: String,
    name: String,
    borough: String,
    location: String,
    num_of_courts: u32,
    lat: f64,
    lon: f64,
}

impl CleanRow {
    fn to_record(&self) -> [String; 7] {
        [
            self.court_id.clone(),
            self.name.clone(),
            self.borough.clone(),
            self.location.clone(),
            self.num_of_courts.to_string(),
            self.lat.to_string(),
            self.lon.to_string(),
        ]
    }
}

fn build_clean_csv(raw_json: &Path, out_csv: &Path) -> Result<usize> {
    if !raw_json.exists() {
        anyhow::bail!("Raw JSON not found at {}", raw_json.display());
    }

    let file = File::open(raw_json)
        .with_context(|| format!("Failed to open {}", raw_json.display()))?;
    let raw: Vec<Map<String, Value>> =
        serde_json::from_reader(file).context("Expected a JSON array of objects")?;

    let rows = clean_rows(raw)?;

    let mut writer = csv::Writer::from_path(out_csv)
        .with_context(|| format!("Failed to create {}", out_csv.display()))?;
    writer.write_record(CLEAN_COLUMNS)?;
    for row in &rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;

    Ok(rows.len())
}

fn clean_rows(raw: Vec<Map<String, Value>>) -> Result<Vec<CleanRow>> {
    let normalized: Vec<Map<String, Value>> = raw
        .into_iter()
        .map(|obj| {
            obj.into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect()
        })
        .collect();

    let has_coords = normalized
        .iter()
        .any(|obj| obj.contains_key("lat") && obj.contains_key("lon"));
    if !normalized.is_empty() && !has_coords {
        anyhow::bail!("Expected 'lat' and 'lon' columns in the raw JSON");
    }

    let mut dropped = 0;
    let mut rows = Vec::with_capacity(normalized.len());

    for obj in &normalized {
        let (lat, lon) = match (number(obj.get("lat")), number(obj.get("lon"))) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let court_id = text(obj.get("prop_id"))
            .or_else(|| text(obj.get("court_id")))
            .unwrap_or_default();

        let borough = text(obj.get("borough")).unwrap_or_else(|| {
            Borough::from_prop_id(&court_id)
                .map(|b| b.as_str().to_string())
                .unwrap_or_default()
        });

        let num_of_courts = match obj.get("num_of_courts") {
            Some(Value::Number(n)) => parse_capacity(Some(&n.to_string())),
            Some(Value::String(s)) => parse_capacity(Some(s)),
            _ => 0,
        };

        rows.push(CleanRow {
            court_id,
            name: text(obj.get("name")).unwrap_or_default(),
            borough,
            location: text(obj.get("location")).unwrap_or_default(),
            num_of_courts,
            lat,
            lon,
        });
    }

    if dropped > 0 {
        warn!("Dropped {} rows without coordinates", dropped);
    }

    Ok(rows)
}

/// Numeric value from a number or a numeric string
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
