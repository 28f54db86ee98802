use std::collections::HashMap;

use crate::types::{ProductKey, ProductRecord};

/// What happened to a single record handed to [`ProductCollector::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was not held before
    Added,
    /// The key was held and the incoming record replaced it
    Replaced,
    /// The held record is newer; the incoming one was dropped
    Kept,
}

/// Totals for one merge of an extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub replaced: usize,
    pub kept: usize,
}

/// Accumulates product records across extraction runs, one entry per key.
///
/// Iteration order is the order in which keys were first seen. On a key
/// collision the record with the larger timestamp survives; on a tie the
/// incoming record wins.
#[derive(Debug, Default, Clone)]
pub struct ProductCollector {
    records: Vec<ProductRecord>,
    index: HashMap<ProductKey, usize>,
}

impl ProductCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one record, applying the newest-wins rule
    pub fn insert(&mut self, record: ProductRecord) -> InsertOutcome {
        match self.index.get(&record.key) {
            Some(&slot) => {
                if record.timestamp >= self.records[slot].timestamp {
                    self.records[slot] = record;
                    InsertOutcome::Replaced
                } else {
                    InsertOutcome::Kept
                }
            }
            None => {
                self.index.insert(record.key.clone(), self.records.len());
                self.records.push(record);
                InsertOutcome::Added
            }
        }
    }

    /// Insert every record of a run and report what changed
    pub fn merge<I>(&mut self, records: I) -> MergeStats
    where
        I: IntoIterator<Item = ProductRecord>,
    {
        let mut stats = MergeStats::default();
        for record in records {
            match self.insert(record) {
                InsertOutcome::Added => stats.added += 1,
                InsertOutcome::Replaced => stats.replaced += 1,
                InsertOutcome::Kept => stats.kept += 1,
            }
        }
        stats
    }

    pub fn contains(&self, key: &ProductKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &ProductKey) -> Option<&ProductRecord> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    /// Records in first-seen key order
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}
