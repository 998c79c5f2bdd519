//! Core data models for the court finder.

pub mod record;
pub mod result;

pub use record::{valid_coordinates, Borough, PointRecord};
pub use result::{Court, NearestResponse, QueryResult};
