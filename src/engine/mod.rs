//! Query engine: named dataset registry, merged k-NN queries, and result
//! projection.
//!
//! Datasets are published as immutable snapshots; queries never lock beyond
//! cloning the current snapshot handle.

mod projector;
mod registry;
mod service;

pub use projector::{court_from_record, project, project_all};
pub use registry::{DatasetRegistry, IndexedDataset, RegistrySnapshot};
pub use service::{QueryEngine, ALL_SPORTS};
