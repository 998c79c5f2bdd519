//! Courtside - nearest sport court search over NYC Parks datasets
//!
//! This library provides the record store, spatial index and query engine
//! shared by the `query` server and the `prepare` data tool.

pub mod config;
pub mod engine;
pub mod error;
pub mod geocode;
pub mod models;
pub mod spatial;
pub mod store;

pub use engine::{DatasetRegistry, QueryEngine};
pub use error::{EngineError, LoadError};
pub use models::{Borough, Court, PointRecord, QueryResult};
pub use spatial::{build_index, SpatialIndex};
pub use store::Dataset;
