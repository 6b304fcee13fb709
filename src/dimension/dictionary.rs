//! Value dictionaries for string dimensions

use crate::{Error, Result};

use std::collections::HashMap;

/// Insertion-ordered dictionary mapping values to ids. Null is a value.
#[derive(Debug, Default)]
pub struct DimensionDictionary {
    id_to_value: Vec<Option<String>>,
    value_to_id: HashMap<String, u32>,
    null_id: Option<u32>,
    min_value: Option<String>,
    max_value: Option<String>,
}

impl DimensionDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_id(&self, value: Option<&str>) -> Option<u32> {
        match value {
            None => self.null_id,
            Some(v) => self.value_to_id.get(v).copied(),
        }
    }

    /// Id of `value`, inserting it if it has not been seen
    pub fn add(&mut self, value: Option<&str>) -> u32 {
        if let Some(id) = self.get_id(value) {
            return id;
        }

        let id = self.id_to_value.len() as u32;
        match value {
            None => self.null_id = Some(id),
            Some(v) => {
                self.value_to_id.insert(v.to_string(), id);
                if self.min_value.as_deref().map_or(true, |min| v < min) {
                    self.min_value = Some(v.to_string());
                }
                if self.max_value.as_deref().map_or(true, |max| v > max) {
                    self.max_value = Some(v.to_string());
                }
            }
        }
        self.id_to_value.push(value.map(str::to_string));
        id
    }

    pub fn value(&self, id: u32) -> Option<&Option<String>> {
        self.id_to_value.get(id as usize)
    }

    pub fn size(&self) -> usize {
        self.id_to_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_value.is_empty()
    }

    /// Smallest non-null value
    pub fn min_value(&self) -> Option<&str> {
        self.min_value.as_deref()
    }

    /// Largest non-null value
    pub fn max_value(&self) -> Option<&str> {
        self.max_value.as_deref()
    }

    /// Snapshot of the current values in sorted order, null first
    pub fn sort(&self) -> SortedDimensionDictionary {
        let mut order: Vec<u32> = (0..self.id_to_value.len() as u32).collect();
        order.sort_by(|a, b| self.id_to_value[*a as usize].cmp(&self.id_to_value[*b as usize]));

        let mut unsorted_to_sorted = vec![0u32; order.len()];
        for (rank, id) in order.iter().enumerate() {
            unsorted_to_sorted[*id as usize] = rank as u32;
        }

        SortedDimensionDictionary {
            sorted_values: order
                .iter()
                .map(|id| self.id_to_value[*id as usize].clone())
                .collect(),
            unsorted_to_sorted,
            sorted_to_unsorted: order,
        }
    }
}

/// Sorted view of a dictionary at a point in time
#[derive(Debug, Clone)]
pub struct SortedDimensionDictionary {
    sorted_values: Vec<Option<String>>,
    unsorted_to_sorted: Vec<u32>,
    sorted_to_unsorted: Vec<u32>,
}

impl SortedDimensionDictionary {
    pub fn size(&self) -> usize {
        self.sorted_values.len()
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.sorted_values
    }

    pub fn value(&self, sorted_id: u32) -> Option<&Option<String>> {
        self.sorted_values.get(sorted_id as usize)
    }

    pub fn sorted_id(&self, unsorted_id: u32) -> Option<u32> {
        self.unsorted_to_sorted.get(unsorted_id as usize).copied()
    }

    pub fn unsorted_id(&self, sorted_id: u32) -> Option<u32> {
        self.sorted_to_unsorted.get(sorted_id as usize).copied()
    }

    /// Ranks of unsorted ids in this snapshot
    pub fn sorted_ids(&self, ids: &[u32]) -> Result<Vec<u32>> {
        ids.iter()
            .map(|id| {
                self.sorted_id(*id).ok_or_else(|| {
                    Error::Internal(format!(
                        "dictionary id {} not in sorted snapshot of {} values",
                        id,
                        self.size()
                    ))
                })
            })
            .collect()
    }

    /// Unsorted ids of ranks in this snapshot
    pub fn unsorted_ids(&self, ranks: &[u32]) -> Result<Vec<u32>> {
        ranks
            .iter()
            .map(|rank| {
                self.unsorted_id(*rank).ok_or_else(|| {
                    Error::Internal(format!(
                        "sorted id {} not in sorted snapshot of {} values",
                        rank,
                        self.size()
                    ))
                })
            })
            .collect()
    }
}
