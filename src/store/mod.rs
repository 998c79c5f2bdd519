//! Immutable record stores and the loader that fills them.

mod dataset;
mod loader;

pub use dataset::Dataset;
pub use loader::{load_all, load_dataset, parse_capacity, read_dataset};
