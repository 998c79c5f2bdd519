//! Query results and the caller-facing court shape.

use serde::{Deserialize, Serialize};

use super::PointRecord;

/// One ranked neighbor of a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub record: PointRecord,

    /// Great-circle distance to the query point, rounded to 2 decimals
    pub distance_km: f64,

    /// Dataset the record came from (e.g. "handball")
    pub source_tag: String,

    /// Insertion position of the record within its dataset
    pub position: usize,

    /// Unrounded distance, used for ranking across datasets
    pub(crate) exact_distance_km: f64,
}

/// A court as returned to HTTP and agent callers.
///
/// Field names follow the cleaned dataset columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Court {
    #[serde(rename = "Court_Id")]
    pub court_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Borough")]
    pub borough: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Num_Of_Courts")]
    pub num_of_courts: u32,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Distance_Km", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Sport", skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
}

/// Response body for nearest-court searches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestResponse {
    pub count: usize,
    pub results: Vec<Court>,
}

impl NearestResponse {
    pub fn new(results: Vec<Court>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}
