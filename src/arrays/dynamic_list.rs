//! A per-entity, variable-length list of indices backed by one flat buffer.
//!
//! In memory the lists are kept CSR-style (`offsets` + concatenated `values`) so
//! `list(i)` is a slice. The persisted form is the flat "count, then run"
//! layout produced by [`DynamicListArray::to_flat`].

use crate::error::{Result, StrataError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicListArray {
    name: String,
    /// `offsets[i]..offsets[i + 1]` is entity `i`'s run; length is entities + 1.
    offsets: Vec<usize>,
    values: Vec<i64>,
}

impl DynamicListArray {
    /// Allocates exactly `counts[i]` zeroed slots for every entity.
    pub fn from_counts(name: &str, counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &count in counts {
            total += count;
            offsets.push(total);
        }
        Self {
            name: name.to_string(),
            offsets,
            values: vec![0; total],
        }
    }

    pub fn from_lists(name: &str, lists: &[Vec<i64>]) -> Self {
        let counts: Vec<usize> = lists.iter().map(Vec::len).collect();
        let mut array = Self::from_counts(name, &counts);
        for (i, list) in lists.iter().enumerate() {
            let (start, end) = (array.offsets[i], array.offsets[i + 1]);
            array.values[start..end].copy_from_slice(list);
        }
        array
    }

    /// Parses the flat `count, idx, idx, ..., count, idx, ...` layout.
    pub fn from_flat(name: &str, num_entities: usize, flat: &[i64]) -> Result<Self> {
        let mut lists = Vec::with_capacity(num_entities);
        let mut cursor = 0usize;
        for entity in 0..num_entities {
            let count = *flat.get(cursor).ok_or_else(|| {
                StrataError::Format(format!(
                    "dynamic list '{}' truncated at entity {} of {}",
                    name, entity, num_entities
                ))
            })?;
            let count = usize::try_from(count).map_err(|_| {
                StrataError::Format(format!(
                    "dynamic list '{}' has negative count {} for entity {}",
                    name, count, entity
                ))
            })?;
            cursor += 1;
            let end = cursor.saturating_add(count);
            let run = flat.get(cursor..end).ok_or_else(|| {
                StrataError::Format(format!(
                    "dynamic list '{}' run for entity {} overruns the buffer",
                    name, entity
                ))
            })?;
            lists.push(run.to_vec());
            cursor += count;
        }
        if cursor != flat.len() {
            return Err(StrataError::Format(format!(
                "dynamic list '{}' has {} trailing values",
                name,
                flat.len() - cursor
            )));
        }
        Ok(Self::from_lists(name, &lists))
    }

    /// The flat `count, then run` layout, one block per entity.
    pub fn to_flat(&self) -> Vec<i64> {
        let mut flat = Vec::with_capacity(self.values.len() + self.num_entities());
        for i in 0..self.num_entities() {
            let run = &self.values[self.offsets[i]..self.offsets[i + 1]];
            flat.push(run.len() as i64);
            flat.extend_from_slice(run);
        }
        flat
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_entities(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of stored indices across all entities.
    pub fn total_len(&self) -> usize {
        self.values.len()
    }

    pub fn count(&self, entity: usize) -> Option<usize> {
        if entity >= self.num_entities() {
            return None;
        }
        Some(self.offsets[entity + 1] - self.offsets[entity])
    }

    pub fn list(&self, entity: usize) -> Option<&[i64]> {
        if entity >= self.num_entities() {
            return None;
        }
        Some(&self.values[self.offsets[entity]..self.offsets[entity + 1]])
    }

    pub fn list_mut(&mut self, entity: usize) -> Option<&mut [i64]> {
        if entity >= self.num_entities() {
            return None;
        }
        let (start, end) = (self.offsets[entity], self.offsets[entity + 1]);
        Some(&mut self.values[start..end])
    }

    /// Replaces the run of one entity, growing or shrinking it as needed.
    pub fn set_list(&mut self, entity: usize, list: &[i64]) -> Result<()> {
        if entity >= self.num_entities() {
            return Err(StrataError::IndexOutOfRange {
                index: entity,
                len: self.num_entities(),
            });
        }
        let (start, end) = (self.offsets[entity], self.offsets[entity + 1]);
        self.values.splice(start..end, list.iter().copied());
        let old_len = end - start;
        for offset in &mut self.offsets[entity + 1..] {
            *offset = *offset - old_len + list.len();
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[i64]> + '_ {
        self.offsets.windows(2).map(move |w| &self.values[w[0]..w[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts_allocates_exactly() {
        let list = DynamicListArray::from_counts("x", &[2, 0, 3]);
        assert_eq!(list.num_entities(), 3);
        assert_eq!(list.total_len(), 5);
        assert_eq!(list.count(1), Some(0));
        assert_eq!(list.list(2).unwrap().len(), 3);
        assert!(list.list(3).is_none());
    }

    #[test]
    fn test_flat_layout() {
        let list = DynamicListArray::from_lists("x", &[vec![4, 5], vec![], vec![9]]);
        assert_eq!(list.to_flat(), vec![2, 4, 5, 0, 1, 9]);
        let parsed = DynamicListArray::from_flat("x", 3, &list.to_flat()).unwrap();
        assert_eq!(parsed, list);
    }

    #[test]
    fn test_from_flat_rejects_malformed_buffers() {
        assert!(DynamicListArray::from_flat("x", 2, &[1, 4]).is_err());
        assert!(DynamicListArray::from_flat("x", 1, &[3, 1, 2]).is_err());
        assert!(DynamicListArray::from_flat("x", 1, &[-1]).is_err());
        assert!(DynamicListArray::from_flat("x", 1, &[1, 2, 7]).is_err());
    }

    #[test]
    fn test_list_mut_writes_in_place() {
        let mut list = DynamicListArray::from_counts("x", &[1, 2]);
        list.list_mut(1).unwrap().copy_from_slice(&[7, 8]);
        let collected: Vec<Vec<i64>> = list.iter().map(|s| s.to_vec()).collect();
        assert_eq!(collected, vec![vec![0], vec![7, 8]]);
    }

    #[test]
    fn test_set_list_resizes_one_run() {
        let mut list = DynamicListArray::from_lists("x", &[vec![1], vec![2, 3], vec![4]]);
        list.set_list(1, &[5, 6, 7]).unwrap();
        list.set_list(0, &[]).unwrap();
        assert_eq!(list.to_flat(), vec![0, 3, 5, 6, 7, 1, 4]);
        assert_eq!(list.total_len(), 4);
        assert!(list.set_list(3, &[1]).is_err());
    }
}
