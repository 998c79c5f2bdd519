//! Query surface over the dataset registry.

use std::sync::Arc;

use super::registry::{DatasetRegistry, IndexedDataset, RegistrySnapshot};
use crate::error::{EngineError, EngineResult};
use crate::models::{valid_coordinates, PointRecord, QueryResult};
use crate::spatial::{distance_key, round_km};

/// Sport selector that expands to every registered dataset
pub const ALL_SPORTS: &str = "both";

/// Nearest-location queries over one or many datasets.
///
/// Every call works against a single registry snapshot, so a concurrent
/// reload never shows a query a mix of old and new data.
#[derive(Clone)]
pub struct QueryEngine {
    registry: Arc<DatasetRegistry>,
}

impl QueryEngine {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    /// k nearest records of one dataset, tagged with its name
    pub fn query_single(
        &self,
        dataset_name: &str,
        lat: f64,
        lon: f64,
        k: usize,
    ) -> EngineResult<Vec<QueryResult>> {
        validate_query(lat, lon, k)?;
        let snapshot = self.registry.snapshot();
        let entry = lookup(&snapshot, dataset_name)?;
        Ok(query_entry(entry, lat, lon, k))
    }

    /// k nearest records across several datasets.
    ///
    /// Each source is asked for the full k before merging, so the global top k
    /// is exact even when a single source holds all of it. Ties are broken by
    /// position within the source dataset, then by the order sources were
    /// named. Repeated names are queried once.
    pub fn query_merged<S: AsRef<str>>(
        &self,
        dataset_names: &[S],
        lat: f64,
        lon: f64,
        k: usize,
    ) -> EngineResult<Vec<QueryResult>> {
        validate_query(lat, lon, k)?;
        if dataset_names.is_empty() {
            return Err(EngineError::InvalidArgument(
                "at least one dataset is required".to_string(),
            ));
        }

        let snapshot = self.registry.snapshot();

        let mut sources: Vec<&Arc<IndexedDataset>> = Vec::with_capacity(dataset_names.len());
        for name in dataset_names {
            let entry = lookup(&snapshot, name.as_ref())?;
            if !sources.iter().any(|s| Arc::ptr_eq(s, entry)) {
                sources.push(entry);
            }
        }

        Ok(merge_sources(&sources, lat, lon, k))
    }

    /// Resolve a sport selector to dataset names; "both" means all of them
    pub fn sport_sources(&self, sport: &str) -> EngineResult<Vec<String>> {
        let snapshot = self.registry.snapshot();
        if sport.eq_ignore_ascii_case(ALL_SPORTS) {
            return Ok(snapshot.names().map(String::from).collect());
        }
        lookup(&snapshot, sport)?;
        Ok(vec![sport.to_string()])
    }

    /// Single-dataset or merged query depending on the sport selector.
    ///
    /// The selector is resolved and queried against the same snapshot.
    pub fn nearest(&self, sport: &str, lat: f64, lon: f64, k: usize) -> EngineResult<Vec<QueryResult>> {
        validate_query(lat, lon, k)?;
        let snapshot = self.registry.snapshot();

        if sport.eq_ignore_ascii_case(ALL_SPORTS) {
            let sources: Vec<&Arc<IndexedDataset>> = snapshot.iter().collect();
            Ok(merge_sources(&sources, lat, lon, k))
        } else {
            Ok(query_entry(lookup(&snapshot, sport)?, lat, lon, k))
        }
    }

    /// Look up a record by id within one dataset
    pub fn find(&self, dataset_name: &str, id: &str) -> EngineResult<Option<PointRecord>> {
        let snapshot = self.registry.snapshot();
        let entry = lookup(&snapshot, dataset_name)?;
        Ok(entry.dataset().find(id).cloned())
    }
}

fn validate_query(lat: f64, lon: f64, k: usize) -> EngineResult<()> {
    if k < 1 {
        return Err(EngineError::InvalidArgument(format!(
            "k must be at least 1, got {}",
            k
        )));
    }
    if !valid_coordinates(lat, lon) {
        return Err(EngineError::InvalidArgument(format!(
            "coordinates out of range: ({}, {})",
            lat, lon
        )));
    }
    Ok(())
}

fn lookup<'a>(snapshot: &'a RegistrySnapshot, name: &str) -> EngineResult<&'a Arc<IndexedDataset>> {
    snapshot
        .get(name)
        .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))
}

/// Top k across sources, ranked by distance key, then position, then source order
fn merge_sources(sources: &[&Arc<IndexedDataset>], lat: f64, lon: f64, k: usize) -> Vec<QueryResult> {
    let mut merged: Vec<QueryResult> = sources
        .iter()
        .flat_map(|entry| query_entry(entry, lat, lon, k))
        .collect();

    // Stable: equal keys keep source order
    merged.sort_by_key(|r| (distance_key(r.exact_distance_km), r.position));
    merged.truncate(k);
    merged
}

fn query_entry(entry: &IndexedDataset, lat: f64, lon: f64, k: usize) -> Vec<QueryResult> {
    let dataset = entry.dataset();
    entry
        .index()
        .nearest(lat, lon, k)
        .into_iter()
        .map(|n| QueryResult {
            record: dataset[n.position].clone(),
            distance_km: round_km(n.distance_km),
            source_tag: entry.name().to_string(),
            position: n.position,
            exact_distance_km: n.distance_km,
        })
        .collect()
}
