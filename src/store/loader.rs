//! Loads cleaned court tables into a [`Dataset`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use tracing::{info, warn};

use super::Dataset;
use crate::error::LoadError;
use crate::models::{Borough, PointRecord};

/// Column positions resolved from the header row
struct Columns {
    id: Option<usize>,
    name: Option<usize>,
    borough: Option<usize>,
    location: Option<usize>,
    capacity: Option<usize>,
    lat: usize,
    lon: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        Ok(Self {
            id: find(&["court_id", "prop_id", "id"]),
            name: find(&["name"]),
            borough: find(&["borough"]),
            location: find(&["location"]),
            capacity: find(&["num_of_courts", "courts", "capacity"]),
            lat: find(&["lat", "latitude"]).ok_or(LoadError::MissingColumn("Lat"))?,
            lon: find(&["lon", "lng", "longitude"]).ok_or(LoadError::MissingColumn("Lon"))?,
        })
    }
}

/// Load a cleaned CSV file; `.gz` files are decompressed on the fly.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    info!("Loading dataset from {}", path.display());

    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let dataset = read_dataset(reader)?;

    if dataset.skipped() > 0 {
        warn!(
            "Skipped {} rows without valid coordinates in {}",
            dataset.skipped(),
            path.display()
        );
    }
    info!("Loaded {} records from {}", dataset.len(), path.display());

    Ok(dataset)
}

/// Load several named dataset files in parallel, preserving input order
pub fn load_all(sources: &[(String, PathBuf)]) -> Result<Vec<(String, Dataset)>, LoadError> {
    sources
        .par_iter()
        .map(|(name, path)| Ok((name.clone(), load_dataset(path)?)))
        .collect()
}

/// Read a cleaned CSV table from any reader
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let row_record = result?;
        records.push(parse_row(&row_record, &columns, row));
    }

    Ok(Dataset::from_records(records))
}

fn parse_row(row: &StringRecord, columns: &Columns, row_number: usize) -> PointRecord {
    let text = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    // Rows without an id still get a stable one from their position
    let mut id = text(columns.id);
    if id.is_empty() {
        id = format!("row-{}", row_number);
    }

    let region = match columns.borough {
        Some(i) => row.get(i).and_then(Borough::from_label),
        None => Borough::from_prop_id(&id),
    };

    PointRecord::new(
        id,
        parse_coordinate(row.get(columns.lat)),
        parse_coordinate(row.get(columns.lon)),
    )
    .with_name(text(columns.name))
    .with_region(region)
    .with_location(text(columns.location))
    .with_capacity(parse_capacity(columns.capacity.and_then(|i| row.get(i))))
}

/// Unparsable coordinates become NaN so dataset construction drops the row
fn parse_coordinate(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Court counts are non-negative integers; anything else counts as zero.
///
/// Exported tables sometimes carry the count as a float ("2.0").
pub fn parse_capacity(value: Option<&str>) -> u32 {
    let value = match value {
        Some(v) => v.trim(),
        None => return 0,
    };

    if let Ok(n) = value.parse::<u32>() {
        return n;
    }

    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
            f as u32
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CLEAN_CSV: &str = "\
Court_Id,Name,Borough,Location,Num_Of_Courts,Lat,Lon
X001,Claremont Park,Bronx,Clay Ave,3,40.8400,-73.9100
B002,McCarren Park,Brooklyn,,2.0,40.7200,-73.9500
M003,No Coords,Manhattan,,1,,
Q004,Astoria Park,,near pool,n/a,40.7790,-73.9220
";

    #[test]
    fn test_read_clean_csv() {
        let dataset = read_dataset(CLEAN_CSV.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.skipped(), 1);

        let first = &dataset[0];
        assert_eq!(first.id, "X001");
        assert_eq!(first.name, "Claremont Park");
        assert_eq!(first.region, Some(Borough::Bronx));
        assert_eq!(first.capacity, 3);
        assert_eq!(first.free_text_location, "Clay Ave");

        assert_eq!(dataset[1].capacity, 2);
        assert_eq!(dataset[1].free_text_location, "");

        let astoria = &dataset[2];
        assert_eq!(astoria.id, "Q004");
        assert_eq!(astoria.region, None);
        assert_eq!(astoria.capacity, 0);
    }

    #[test]
    fn test_borough_inferred_without_column() {
        let csv = "court_id,name,lat,lon\nR100,Wolfe's Pond,40.52,-74.19\n";
        let dataset = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(dataset[0].region, Some(Borough::StatenIsland));
    }

    #[test]
    fn test_missing_coordinate_columns() {
        let csv = "court_id,name\nX1,Somewhere\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Lat")));
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity(Some("4")), 4);
        assert_eq!(parse_capacity(Some(" 2.0 ")), 2);
        assert_eq!(parse_capacity(Some("2.5")), 0);
        assert_eq!(parse_capacity(Some("-1")), 0);
        assert_eq!(parse_capacity(Some("")), 0);
        assert_eq!(parse_capacity(None), 0);
    }

    #[test]
    fn test_load_gzip_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tennis.csv.gz");

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(CLEAN_CSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_load_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let handball = dir.path().join("handball.csv");
        let tennis = dir.path().join("tennis.csv");
        std::fs::write(&handball, CLEAN_CSV).unwrap();
        std::fs::write(&tennis, "court_id,lat,lon\nT1,40.7,-73.9\n").unwrap();

        let loaded = load_all(&[
            ("tennis".to_string(), tennis),
            ("handball".to_string(), handball),
        ])
        .unwrap();

        assert_eq!(loaded[0].0, "tennis");
        assert_eq!(loaded[0].1.len(), 1);
        assert_eq!(loaded[1].0, "handball");
        assert_eq!(loaded[1].1.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/courts.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
