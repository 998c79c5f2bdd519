//! Exact k-nearest lookups over a dataset.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::info;

use super::haversine::{
    distance_key, haversine_rad, round_km, unit_vector, DISTANCE_QUANTUM_KM, EARTH_RADIUS_KM,
};
use crate::models::PointRecord;
use crate::store::Dataset;

/// Slack on squared chord length when collecting candidates past the k-th.
///
/// Squared chord changes by at most `2 * dθ`, so this covers every point whose
/// distance can share the k-th's ranking key.
const CHORD_TOLERANCE: f64 = 2.0 * DISTANCE_QUANTUM_KM / EARTH_RADIUS_KM + 1e-12;

/// Record position keyed by its unit-sphere vector
type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// A neighbor found by the index, before projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the record in the dataset
    pub position: usize,
    /// Unrounded great-circle distance
    pub distance_km: f64,
}

/// R-tree over a dataset's points on the unit sphere.
///
/// Owns its dataset so the pair can only be published or replaced together.
pub struct SpatialIndex {
    dataset: Dataset,
    /// (lat, lon) in radians, by dataset position
    coords_rad: Vec<(f64, f64)>,
    tree: RTree<IndexedPoint>,
}

/// Build the spatial index for a dataset
pub fn build_index(dataset: Dataset) -> SpatialIndex {
    SpatialIndex::build(dataset)
}

impl SpatialIndex {
    pub fn build(dataset: Dataset) -> Self {
        let coords_rad: Vec<(f64, f64)> = dataset
            .iter()
            .map(|r| (r.latitude.to_radians(), r.longitude.to_radians()))
            .collect();

        let points: Vec<IndexedPoint> = coords_rad
            .iter()
            .enumerate()
            .map(|(position, &(lat, lon))| GeomWithData::new(unit_vector(lat, lon), position))
            .collect();

        let tree = RTree::bulk_load(points);

        info!("Spatial index built with {} entries", tree.size());

        Self {
            dataset,
            coords_rad,
            tree,
        }
    }

    /// Exact k nearest records to a point given in degrees.
    ///
    /// Results are ordered by distance, then by dataset position. `k` is
    /// clamped to the dataset size.
    pub fn nearest(&self, lat: f64, lon: f64, k: usize) -> Vec<Neighbor> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }

        let (qlat, qlon) = (lat.to_radians(), lon.to_radians());
        let query = unit_vector(qlat, qlon);

        // Pull the k closest by chord, plus anything tied with the k-th
        let mut candidates = Vec::with_capacity(k);
        let mut cutoff = None;
        for (point, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if let Some(cutoff) = cutoff {
                if distance_2 > cutoff + CHORD_TOLERANCE {
                    break;
                }
            }
            candidates.push(point.data);
            if cutoff.is_none() && candidates.len() == k {
                cutoff = Some(distance_2);
            }
        }

        let mut neighbors: Vec<Neighbor> = candidates
            .into_iter()
            .map(|position| {
                let (plat, plon) = self.coords_rad[position];
                Neighbor {
                    position,
                    distance_km: haversine_rad(qlat, qlon, plat, plon) * EARTH_RADIUS_KM,
                }
            })
            .collect();

        neighbors.sort_by_key(|n| (distance_key(n.distance_km), n.position));
        neighbors.truncate(k);
        neighbors
    }

    /// The k nearest records with distances rounded to 2 decimals
    pub fn query_k(&self, lat: f64, lon: f64, k: usize) -> Vec<(&PointRecord, f64)> {
        self.nearest(lat, lon, k)
            .into_iter()
            .map(|n| (&self.dataset[n.position], round_km(n.distance_km)))
            .collect()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{distance_key, haversine_km};

    fn grid_dataset() -> Dataset {
        let mut records = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let lat = 40.5 + i as f64 * 0.02;
                let lon = -74.2 + j as f64 * 0.025;
                records.push(PointRecord::new(format!("{}-{}", i, j), lat, lon));
            }
        }
        Dataset::from_records(records)
    }

    /// Brute-force reference ordering
    fn linear_scan(dataset: &Dataset, lat: f64, lon: f64, k: usize) -> Vec<usize> {
        let mut all: Vec<(i64, usize)> = dataset
            .iter()
            .enumerate()
            .map(|(i, r)| (distance_key(haversine_km(lat, lon, r.latitude, r.longitude)), i))
            .collect();
        all.sort();
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    #[test]
    fn test_example_two_points() {
        let index = build_index(Dataset::from_records(vec![
            PointRecord::new("A", 40.730, -73.935),
            PointRecord::new("B", 40.758, -73.985),
        ]));

        let results = index.query_k(40.730, -73.935, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "A");
        assert_eq!(results[0].1, 0.0);
        assert_eq!(results[1].0.id, "B");
        assert!(results[1].1 > 5.0 && results[1].1 < 6.0);
    }

    #[test]
    fn test_empty_index() {
        let index = build_index(Dataset::empty());
        assert!(index.is_empty());
        assert!(index.query_k(40.0, -73.0, 5).is_empty());
    }

    #[test]
    fn test_k_clamped_to_dataset_size() {
        let index = build_index(Dataset::from_records(vec![
            PointRecord::new("A", 40.0, -73.0),
            PointRecord::new("B", 41.0, -74.0),
        ]));
        assert_eq!(index.query_k(40.0, -73.0, 10).len(), 2);
        assert!(index.query_k(40.0, -73.0, 0).is_empty());
    }

    #[test]
    fn test_matches_linear_scan() {
        let dataset = grid_dataset();
        let index = build_index(dataset.clone());

        for &(lat, lon) in &[(40.71, -73.99), (40.5, -74.3), (40.9, -73.7), (40.61, -74.05)] {
            for k in [1, 3, 7, 25] {
                let got: Vec<usize> = index.nearest(lat, lon, k).iter().map(|n| n.position).collect();
                assert_eq!(got, linear_scan(&dataset, lat, lon, k), "at ({}, {}) k={}", lat, lon, k);
            }
        }
    }

    #[test]
    fn test_sorted_non_decreasing() {
        let index = build_index(grid_dataset());
        let results = index.query_k(40.7, -73.95, 30);
        assert_eq!(results.len(), 30);
        assert!(results.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        // Same coordinates, inserted in a non-alphabetical order
        let index = build_index(Dataset::from_records(vec![
            PointRecord::new("far", 41.0, -73.0),
            PointRecord::new("c", 40.0, -73.0),
            PointRecord::new("a", 40.0, -73.0),
            PointRecord::new("b", 40.0, -73.0),
        ]));

        for _ in 0..3 {
            let ids: Vec<&str> = index
                .query_k(40.0, -73.0, 2)
                .iter()
                .map(|(r, _)| r.id.as_str())
                .collect();
            assert_eq!(ids, vec!["c", "a"]);
        }
    }

    #[test]
    fn test_equidistant_east_west_keep_insertion_order() {
        for step in 1..200 {
            let d = step as f64 * 0.001;
            let index = build_index(Dataset::from_records(vec![
                PointRecord::new("first", 40.7, -73.9 + d),
                PointRecord::new("second", 40.7, -73.9 - d),
            ]));

            let results = index.query_k(40.7, -73.9, 2);
            let ids: Vec<&str> = results.iter().map(|(r, _)| r.id.as_str()).collect();
            assert_eq!(ids, vec!["first", "second"], "offset {}", d);
            assert_eq!(results[0].1, results[1].1);
        }
    }

    #[test]
    fn test_equidistant_tie_past_k() {
        // The later-inserted twin must not displace the earlier one at the cutoff
        let index = build_index(Dataset::from_records(vec![
            PointRecord::new("near", 40.7, -73.9),
            PointRecord::new("east", 40.7, -73.85),
            PointRecord::new("west", 40.7, -73.95),
        ]));

        let ids: Vec<&str> = index
            .query_k(40.7, -73.9, 2)
            .iter()
            .map(|(r, _)| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["near", "east"]);
    }

    #[test]
    fn test_repeated_queries_identical() {
        // Roughly equidistant north and south of the query point
        let index = build_index(Dataset::from_records(vec![
            PointRecord::new("north", 10.5, 20.0),
            PointRecord::new("south", 9.5, 20.0),
            PointRecord::new("east", 10.0, 20.5),
        ]));

        let first = index.nearest(10.0, 20.0, 2);
        for _ in 0..5 {
            assert_eq!(index.nearest(10.0, 20.0, 2), first);
        }
    }

    #[test]
    fn test_antipodal_query() {
        let index = build_index(Dataset::from_records(vec![PointRecord::new("A", 0.0, 0.0)]));
        let results = index.query_k(0.0, 180.0, 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_finite());
    }
}
