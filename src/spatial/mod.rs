//! Haversine distance and the nearest-neighbor index.

mod haversine;
mod index;

pub use haversine::{
    distance_key, haversine_km, haversine_rad, round_km, unit_vector, DISTANCE_QUANTUM_KM,
    EARTH_RADIUS_KM,
};
pub use index::{build_index, Neighbor, SpatialIndex};
