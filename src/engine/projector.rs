//! Maps query results to the caller-facing [`Court`] shape.

use crate::models::{Court, PointRecord, QueryResult};

/// Project one ranked result. Missing text fields come out empty, never as errors.
pub fn project(result: &QueryResult) -> Court {
    let mut court = court_from_record(&result.record, Some(&result.source_tag));
    court.distance_km = Some(result.distance_km);
    court
}

pub fn project_all(results: &[QueryResult]) -> Vec<Court> {
    results.iter().map(project).collect()
}

/// Project a bare record, e.g. for id lookups where there is no query point
pub fn court_from_record(record: &PointRecord, sport: Option<&str>) -> Court {
    Court {
        court_id: record.id.clone(),
        name: record.name.clone(),
        borough: record
            .region
            .map(|b| b.as_str().to_string())
            .unwrap_or_default(),
        lat: record.latitude,
        lon: record.longitude,
        num_of_courts: record.capacity,
        location: record.free_text_location.clone(),
        distance_km: None,
        sport: sport.map(String::from),
    }
}
