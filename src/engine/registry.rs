//! Named dataset + index pairs, published as immutable snapshots.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use tracing::info;

use crate::spatial::SpatialIndex;
use crate::store::Dataset;

/// A dataset and its index, built together and never modified.
pub struct IndexedDataset {
    name: String,
    index: SpatialIndex,
    built_at: DateTime<Utc>,
}

impl IndexedDataset {
    pub fn build(name: impl Into<String>, dataset: Dataset) -> Self {
        let name = name.into();
        info!("Building index for dataset '{}' ({} records)", name, dataset.len());

        Self {
            name,
            index: SpatialIndex::build(dataset),
            built_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn dataset(&self) -> &Dataset {
        self.index.dataset()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Point-in-time view of every registered dataset.
///
/// Iteration order is registration order.
#[derive(Default)]
pub struct RegistrySnapshot {
    entries: Vec<Arc<IndexedDataset>>,
    by_name: HashMap<String, usize>,
}

impl RegistrySnapshot {
    fn from_entries(entries: Vec<Arc<IndexedDataset>>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self { entries, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<IndexedDataset>> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<IndexedDataset>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry of named datasets.
///
/// Readers take an `Arc` to the current snapshot and keep it for the whole
/// query. Writers build the replacement off to the side and swap the `Arc`;
/// a snapshot is never mutated once published.
#[derive(Default)]
pub struct DatasetRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every dataset and publish them in one snapshot
    pub fn from_datasets<I, S>(datasets: I) -> Self
    where
        I: IntoIterator<Item = (S, Dataset)>,
        S: Into<String>,
    {
        let registry = Self::new();
        let entries: Vec<Arc<IndexedDataset>> = datasets
            .into_iter()
            .map(|(name, dataset)| Arc::new(IndexedDataset::build(name, dataset)))
            .collect();
        registry.publish(RegistrySnapshot::from_entries(dedup_by_name(entries)));
        registry
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Build an index for `dataset` and swap it in under `name`.
    ///
    /// Replacing keeps the dataset's position in iteration order; a new name
    /// is appended.
    pub fn replace(&self, name: impl Into<String>, dataset: Dataset) -> Arc<IndexedDataset> {
        let built = Arc::new(IndexedDataset::build(name, dataset));

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut entries = guard.entries.clone();
        match guard.by_name.get(built.name()) {
            Some(&i) => entries[i] = Arc::clone(&built),
            None => entries.push(Arc::clone(&built)),
        }
        *guard = Arc::new(RegistrySnapshot::from_entries(entries));
        drop(guard);

        info!("Published dataset '{}'", built.name());
        built
    }

    fn publish(&self, snapshot: RegistrySnapshot) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(snapshot);
    }
}

/// Later entries with an already-seen name replace the earlier one in place
fn dedup_by_name(entries: Vec<Arc<IndexedDataset>>) -> Vec<Arc<IndexedDataset>> {
    let mut out: Vec<Arc<IndexedDataset>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match out.iter().position(|e| e.name == entry.name) {
            Some(i) => out[i] = entry,
            None => out.push(entry),
        }
    }
    out
}
