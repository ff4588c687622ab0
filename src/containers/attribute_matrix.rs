//! A named set of arrays sharing one tuple-dimension vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::arrays::{AnyArray, TypedArray};
use crate::error::{Result, StrataError};
use crate::traits::Element;
use crate::utils::checked_product;

/// What the tuples of a matrix stand for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixCategory {
    Vertex,
    Edge,
    Face,
    Cell,
    VertexFeature,
    EdgeFeature,
    FaceFeature,
    CellFeature,
    VertexEnsemble,
    EdgeEnsemble,
    FaceEnsemble,
    CellEnsemble,
    MetaData,
    #[default]
    Generic,
    Unknown,
}

impl MatrixCategory {
    /// Feature and ensemble matrices hold aggregates addressed by integer ids.
    pub fn is_feature_or_ensemble(&self) -> bool {
        use MatrixCategory::*;
        matches!(
            self,
            VertexFeature
                | EdgeFeature
                | FaceFeature
                | CellFeature
                | VertexEnsemble
                | EdgeEnsemble
                | FaceEnsemble
                | CellEnsemble
        )
    }
}

impl fmt::Display for MatrixCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMatrix {
    name: String,
    tuple_dims: Vec<usize>,
    category: MatrixCategory,
    arrays: BTreeMap<String, AnyArray>,
}

impl AttributeMatrix {
    pub fn new(name: &str, tuple_dims: Vec<usize>, category: MatrixCategory) -> Self {
        Self {
            name: name.to_string(),
            tuple_dims,
            category,
            arrays: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn category(&self) -> MatrixCategory {
        self.category
    }

    pub fn set_category(&mut self, category: MatrixCategory) {
        self.category = category;
    }

    pub fn tuple_dims(&self) -> &[usize] {
        &self.tuple_dims
    }

    /// Replaces the tuple dimensions without touching any array.
    pub fn set_tuple_dims(&mut self, tuple_dims: Vec<usize>) {
        self.tuple_dims = tuple_dims;
    }

    /// Product of the tuple dimensions; saturates instead of overflowing.
    pub fn num_tuples(&self) -> usize {
        checked_product(&self.tuple_dims).unwrap_or(usize::MAX)
    }

    //==============================================================================
    // Array Management
    //==============================================================================

    /// Inserts `array` under `name`, replacing (and returning) any previous entry.
    ///
    /// The array's tuple count is not checked here; see [`Self::validate_array_sizes`].
    pub fn add_array(&mut self, name: &str, array: impl Into<AnyArray>) -> Result<Option<AnyArray>> {
        if name.is_empty() {
            return Err(StrataError::EmptyName(format!("array in matrix '{}'", self.name)));
        }
        let mut array = array.into();
        array.set_name(name);
        Ok(self.arrays.insert(name.to_string(), array))
    }

    pub fn get_array(&self, name: &str) -> Option<&AnyArray> {
        self.arrays.get(name)
    }

    pub fn get_array_mut(&mut self, name: &str) -> Option<&mut AnyArray> {
        self.arrays.get_mut(name)
    }

    pub fn get_typed<T: Element>(&self, name: &str) -> Option<&TypedArray<T>> {
        self.arrays.get(name).and_then(|a| a.downcast_ref::<T>())
    }

    pub fn get_typed_mut<T: Element>(&mut self, name: &str) -> Option<&mut TypedArray<T>> {
        self.arrays.get_mut(name).and_then(|a| a.downcast_mut::<T>())
    }

    pub fn contains_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn remove_array(&mut self, name: &str) -> Option<AnyArray> {
        self.arrays.remove(name)
    }

    /// Array names in sorted order.
    pub fn array_names(&self) -> Vec<String> {
        self.arrays.keys().cloned().collect()
    }

    pub fn arrays(&self) -> impl Iterator<Item = (&String, &AnyArray)> {
        self.arrays.iter()
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Moves `old` to `new`. With `overwrite`, an existing `new` is replaced.
    pub fn rename_array(&mut self, old: &str, new: &str, overwrite: bool) -> Result<()> {
        if new.is_empty() {
            return Err(StrataError::EmptyName(format!("array in matrix '{}'", self.name)));
        }
        if !self.arrays.contains_key(old) {
            return Err(StrataError::SourceMissing(format!("{}/{}", self.name, old)));
        }
        if old == new {
            return Ok(());
        }
        if self.arrays.contains_key(new) && !overwrite {
            return Err(StrataError::TargetExists(format!("{}/{}", self.name, new)));
        }
        if let Some(mut array) = self.arrays.remove(old) {
            array.set_name(new);
            self.arrays.insert(new.to_string(), array);
        }
        Ok(())
    }

    //==============================================================================
    // Shape Management
    //==============================================================================

    /// Sets new tuple dimensions and resizes every array to their product.
    pub fn resize_arrays(&mut self, tuple_dims: Vec<usize>) -> Result<()> {
        let num_tuples = checked_product(&tuple_dims)?;
        for array in self.arrays.values_mut() {
            array.resize(num_tuples)?;
        }
        self.tuple_dims = tuple_dims;
        Ok(())
    }

    /// Checks that every array's tuple count equals the matrix tuple count.
    pub fn validate_array_sizes(&self) -> Result<()> {
        let expected = self.num_tuples();
        let arrays: Vec<String> = self
            .arrays
            .iter()
            .filter(|(_, a)| a.num_tuples() != expected)
            .map(|(name, _)| name.clone())
            .collect();
        if arrays.is_empty() {
            Ok(())
        } else {
            Err(StrataError::MatrixSizeMismatch {
                matrix: self.name.clone(),
                expected,
                arrays,
            })
        }
    }

    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Same name, shape and category, with every array unallocated.
    pub fn schema_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            tuple_dims: self.tuple_dims.clone(),
            category: self.category,
            arrays: self
                .arrays
                .iter()
                .map(|(name, array)| (name.clone(), array.placeholder()))
                .collect(),
        }
    }

    /// Removes the aggregates whose `active` flag is false and renumbers the ids
    /// in `feature_ids` that point at them.
    ///
    /// Only feature and ensemble matrices qualify; tuple 0 (the background
    /// aggregate) is always kept. Ids of removed aggregates become 0. Returns
    /// `Ok(false)` without changes when the matrix does not qualify.
    pub fn remove_inactive_objects(
        &mut self,
        active: &[bool],
        feature_ids: &mut TypedArray<i32>,
    ) -> Result<bool> {
        if !self.category.is_feature_or_ensemble() {
            return Ok(false);
        }
        let total = self.num_tuples();
        if active.len() != total {
            return Err(StrataError::InvalidParameter(format!(
                "matrix '{}' has {} tuples but {} activity flags were given",
                self.name,
                total,
                active.len()
            )));
        }

        let mut new_ids = vec![0i32; total];
        let mut remove = Vec::new();
        let mut next_id = 1i32;
        for (i, &is_active) in active.iter().enumerate().skip(1) {
            if is_active {
                new_ids[i] = next_id;
                next_id += 1;
            } else {
                remove.push(i);
            }
        }
        if remove.is_empty() {
            return Ok(true);
        }

        for array in self.arrays.values_mut() {
            if array.num_tuples() == total {
                array.erase_tuples(&remove)?;
            } else {
                array.resize(total - remove.len())?;
            }
        }
        self.tuple_dims = vec![total - remove.len()];

        for id in feature_ids.as_mut_slice() {
            if let Some(&renamed) = usize::try_from(*id).ok().and_then(|i| new_ids.get(i)) {
                *id = renamed;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn matrix_with_arrays() -> AttributeMatrix {
        let mut m = AttributeMatrix::new("Data", vec![10], MatrixCategory::Cell);
        m.add_array("A", TypedArray::<u8>::new("", 10, vec![1], 0).unwrap())
            .unwrap();
        m.add_array("V", TypedArray::<f32>::new("", 10, vec![3], 1.0).unwrap())
            .unwrap();
        m
    }

    #[test]
    fn test_add_sets_name_and_overwrites() {
        let mut m = matrix_with_arrays();
        assert_eq!(m.get_array("A").unwrap().name(), "A");
        let previous = m
            .add_array("A", TypedArray::<i64>::new("x", 10, vec![1], 0).unwrap())
            .unwrap();
        assert_eq!(previous.unwrap().kind(), ElementKind::UInt8);
        assert_eq!(m.get_array("A").unwrap().kind(), ElementKind::Int64);
        assert!(m.add_array("", TypedArray::<u8>::unallocated("", vec![1]).unwrap()).is_err());
    }

    #[test]
    fn test_add_does_not_enforce_tuple_count() {
        let mut m = matrix_with_arrays();
        m.add_array("short", TypedArray::<u8>::new("", 3, vec![1], 0).unwrap())
            .unwrap();
        match m.validate_array_sizes() {
            Err(StrataError::MatrixSizeMismatch { arrays, expected, .. }) => {
                assert_eq!(arrays, vec!["short".to_string()]);
                assert_eq!(expected, 10);
            }
            other => panic!("expected size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_rename_error_cases() {
        let mut m = matrix_with_arrays();
        assert!(matches!(m.rename_array("missing", "B", false), Err(StrataError::SourceMissing(_))));
        assert!(matches!(m.rename_array("A", "V", false), Err(StrataError::TargetExists(_))));
        m.rename_array("A", "B", false).unwrap();
        assert!(!m.contains_array("A"));
        assert_eq!(m.get_array("B").unwrap().name(), "B");
        m.rename_array("B", "V", true).unwrap();
        assert_eq!(m.get_array("V").unwrap().kind(), ElementKind::UInt8);
        assert_eq!(m.num_arrays(), 1);
    }

    #[test]
    fn test_resize_arrays_applies_product() {
        let mut m = matrix_with_arrays();
        m.resize_arrays(vec![2, 3, 4]).unwrap();
        assert_eq!(m.num_tuples(), 24);
        for (_, array) in m.arrays() {
            assert_eq!(array.num_tuples(), 24);
        }
        assert!(m.validate_array_sizes().is_ok());
    }

    #[test]
    fn test_remove_inactive_objects_renumbers_ids() {
        let mut features = AttributeMatrix::new("Features", vec![4], MatrixCategory::CellFeature);
        features
            .add_array("Size", TypedArray::from_vec("", vec![1], vec![0.0f32, 10.0, 20.0, 30.0]).unwrap())
            .unwrap();
        let mut ids = TypedArray::from_vec("FeatureIds", vec![1], vec![0, 1, 2, 3, 2, 1]).unwrap();

        let changed = features
            .remove_inactive_objects(&[true, true, false, true], &mut ids)
            .unwrap();
        assert!(changed);
        assert_eq!(features.tuple_dims(), &[3]);
        assert_eq!(features.get_typed::<f32>("Size").unwrap().as_slice(), &[0.0, 10.0, 30.0]);
        assert_eq!(ids.as_slice(), &[0, 1, 0, 2, 0, 1]);
    }

    #[test]
    fn test_remove_inactive_objects_requires_feature_matrix() {
        let mut m = matrix_with_arrays();
        let mut ids = TypedArray::from_vec("ids", vec![1], vec![0i32]).unwrap();
        assert!(!m.remove_inactive_objects(&[true; 10], &mut ids).unwrap());
    }
}
