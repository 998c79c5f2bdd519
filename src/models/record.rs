//! Point records: one sport location each.

use serde::{Deserialize, Serialize};

/// NYC borough a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Borough {
    Bronx,
    Brooklyn,
    Manhattan,
    Queens,
    #[serde(rename = "Staten Island")]
    StatenIsland,
}

impl Borough {
    /// Infer the borough from a Parks property id prefix ("X123" -> Bronx).
    pub fn from_prop_id(prop_id: &str) -> Option<Self> {
        match prop_id.trim().chars().next()?.to_ascii_uppercase() {
            'X' => Some(Borough::Bronx),
            'B' => Some(Borough::Brooklyn),
            'M' => Some(Borough::Manhattan),
            'Q' => Some(Borough::Queens),
            'R' => Some(Borough::StatenIsland),
            _ => None,
        }
    }

    /// Parse a borough label as written in cleaned data files.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::all()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(label))
    }

    pub fn all() -> &'static [Borough] {
        &[
            Borough::Bronx,
            Borough::Brooklyn,
            Borough::Manhattan,
            Borough::Queens,
            Borough::StatenIsland,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Borough::Bronx => "Bronx",
            Borough::Brooklyn => "Brooklyn",
            Borough::Manhattan => "Manhattan",
            Borough::Queens => "Queens",
            Borough::StatenIsland => "Staten Island",
        }
    }
}

impl std::fmt::Display for Borough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single location in a dataset.
///
/// The sport/source tag is not stored here; the query engine attaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Stable identifier, unique within its dataset
    pub id: String,

    /// Display name, may be empty
    pub name: String,

    /// Borough, `None` when unknown
    pub region: Option<Borough>,

    pub latitude: f64,
    pub longitude: f64,

    /// Number of courts at the location
    pub capacity: u32,

    /// Free-text description of where the courts are
    pub free_text_location: String,
}

impl PointRecord {
    /// Create a record with only the required fields set
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            region: None,
            latitude,
            longitude,
            capacity: 0,
            free_text_location: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_region(mut self, region: Option<Borough>) -> Self {
        self.region = region;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.free_text_location = location.into();
        self
    }

    /// True when the coordinate pair is finite and within valid degree ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        valid_coordinates(self.latitude, self.longitude)
    }
}

/// Latitude in [-90, 90] and longitude in [-180, 180], both finite.
pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}
