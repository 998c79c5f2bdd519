//! Immutable, ordered record store.

use std::ops::Index;

use crate::models::PointRecord;

/// An ordered sequence of records, fixed after construction.
///
/// Records without a valid coordinate pair never make it in. Position in the
/// sequence is the record's insertion order and is used as the ranking
/// tie-break.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<PointRecord>,
    skipped: usize,
}

impl Dataset {
    /// Build a dataset, dropping records with missing or out-of-range coordinates
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PointRecord>,
    {
        let mut skipped = 0;
        let records = records
            .into_iter()
            .filter(|r| {
                let keep = r.has_valid_coordinates();
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .collect();

        Self { records, skipped }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of input records rejected at construction
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, position: usize) -> Option<&PointRecord> {
        self.records.get(position)
    }

    /// Find a record by its id
    pub fn find(&self, id: &str) -> Option<&PointRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }
}

impl Index<usize> for Dataset {
    type Output = PointRecord;

    fn index(&self, position: usize) -> &Self::Output {
        &self.records[position]
    }
}
