//! Filter parameters as stored in a pipeline document.
//!
//! A filter writes its parameters into a [`ParameterWriter`] (a sorted map of
//! name -> tagged value) and restores them from a [`ParameterReader`]. Reading
//! never fails: a missing key yields the caller's default, a key of the wrong
//! type yields the default and logs a warning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::containers::{DataArrayPath, MatrixCategory};
use crate::error::{Result, StrataError};
use crate::types::ElementKind;

//==================================================================================
// 1. Composite Parameter Payloads
//==================================================================================

/// A rotation given as an angle (degrees) about an axis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisAngleInput {
    pub angle: f32,
    pub axis: [f32; 3],
}

/// Describes a numbered series of input files, e.g. `slice_001.tif` .. `slice_120.tif`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FileListInfo {
    pub input_path: String,
    pub file_prefix: String,
    pub file_suffix: String,
    pub file_extension: String,
    pub start_index: i64,
    pub end_index: i64,
    pub increment: i64,
    pub padding_digits: usize,
    /// Walk the range from `end_index` down to `start_index`.
    #[serde(default)]
    pub reverse: bool,
}

impl FileListInfo {
    /// Expands the description into concrete paths, in order.
    pub fn file_names(&self) -> Vec<PathBuf> {
        if self.increment <= 0 || self.end_index < self.start_index {
            return Vec::new();
        }
        let mut indices: Vec<i64> = (self.start_index..=self.end_index)
            .step_by(self.increment as usize)
            .collect();
        if self.reverse {
            indices.reverse();
        }
        let ext = self.file_extension.trim_start_matches('.');
        indices
            .into_iter()
            .map(|i| {
                let file = format!(
                    "{}{:0width$}{}.{}",
                    self.file_prefix,
                    i,
                    self.file_suffix,
                    ext,
                    width = self.padding_digits
                );
                PathBuf::from(&self.input_path).join(file)
            })
            .collect()
    }
}

/// A small editable table of numbers with row and column headers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DynamicTableData {
    pub row_headers: Vec<String>,
    pub column_headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DynamicTableData {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let table = Self {
            row_headers: (0..rows.len()).map(|i| i.to_string()).collect(),
            column_headers: (0..rows.first().map_or(0, Vec::len))
                .map(|i| i.to_string())
                .collect(),
            rows,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.column_headers.len()
    }

    /// Checks that every row is as wide as the header row.
    pub fn validate(&self) -> Result<()> {
        if self.row_headers.len() != self.rows.len() {
            return Err(StrataError::InvalidParameter(format!(
                "table has {} rows but {} row headers",
                self.rows.len(),
                self.row_headers.len()
            )));
        }
        if let Some((i, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.column_headers.len())
        {
            return Err(StrataError::InvalidParameter(format!(
                "table row {} has {} values but there are {} columns",
                i,
                row.len(),
                self.column_headers.len()
            )));
        }
        Ok(())
    }
}

//==================================================================================
// 2. The Tagged Value
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    IntVector(Vec<i64>),
    FloatVector(Vec<f64>),
    IntVec3([i32; 3]),
    FloatVec3([f32; 3]),
    SecondOrderPolynomial([f32; 6]),
    ThirdOrderPolynomial([f32; 10]),
    FourthOrderPolynomial([f32; 15]),
    AxisAngle(AxisAngleInput),
    AxisAngles(Vec<AxisAngleInput>),
    FileList(FileListInfo),
    Path(DataArrayPath),
    Paths(Vec<DataArrayPath>),
    Table(DynamicTableData),
    ElementKind(ElementKind),
    Category(MatrixCategory),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::IntVector(_) => "int_vector",
            ParameterValue::FloatVector(_) => "float_vector",
            ParameterValue::IntVec3(_) => "int_vec3",
            ParameterValue::FloatVec3(_) => "float_vec3",
            ParameterValue::SecondOrderPolynomial(_) => "second_order_polynomial",
            ParameterValue::ThirdOrderPolynomial(_) => "third_order_polynomial",
            ParameterValue::FourthOrderPolynomial(_) => "fourth_order_polynomial",
            ParameterValue::AxisAngle(_) => "axis_angle",
            ParameterValue::AxisAngles(_) => "axis_angles",
            ParameterValue::FileList(_) => "file_list",
            ParameterValue::Path(_) => "path",
            ParameterValue::Paths(_) => "paths",
            ParameterValue::Table(_) => "table",
            ParameterValue::ElementKind(_) => "element_kind",
            ParameterValue::Category(_) => "category",
        }
    }
}

macro_rules! impl_from_for_parameter {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for ParameterValue {
                fn from(value: $source) -> Self {
                    ParameterValue::$variant(value)
                }
            }
        )+
    };
}

impl_from_for_parameter!(
    String => String,
    bool => Bool,
    i64 => Int,
    f64 => Float,
    Vec<i64> => IntVector,
    Vec<f64> => FloatVector,
    [i32; 3] => IntVec3,
    [f32; 3] => FloatVec3,
    [f32; 6] => SecondOrderPolynomial,
    [f32; 10] => ThirdOrderPolynomial,
    [f32; 15] => FourthOrderPolynomial,
    AxisAngleInput => AxisAngle,
    Vec<AxisAngleInput> => AxisAngles,
    FileListInfo => FileList,
    DataArrayPath => Path,
    Vec<DataArrayPath> => Paths,
    DynamicTableData => Table,
    ElementKind => ElementKind,
    MatrixCategory => Category,
);

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<usize> for ParameterValue {
    fn from(value: usize) -> Self {
        ParameterValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(value.into())
    }
}

impl From<Vec<usize>> for ParameterValue {
    fn from(value: Vec<usize>) -> Self {
        ParameterValue::IntVector(
            value
                .into_iter()
                .map(|v| i64::try_from(v).unwrap_or(i64::MAX))
                .collect(),
        )
    }
}

//==================================================================================
// 3. Writer and Reader
//==================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterWriter {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn values(&self) -> &BTreeMap<String, ParameterValue> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, ParameterValue> {
        self.values
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterReader {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterReader {
    pub fn new(values: BTreeMap<String, ParameterValue>) -> Self {
        Self { values }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    fn read_with<T>(
        &self,
        name: &str,
        default: T,
        expected: &str,
        extract: impl FnOnce(&ParameterValue) -> Option<T>,
    ) -> T {
        match self.values.get(name) {
            None => default,
            Some(value) => match extract(value) {
                Some(v) => v,
                None => {
                    log::warn!(
                        "parameter '{}' holds a {} value where {} was expected; using the default",
                        name,
                        value.type_name(),
                        expected
                    );
                    default
                }
            },
        }
    }

    pub fn read_string(&self, name: &str, default: &str) -> String {
        self.read_with(name, default.to_string(), "string", |v| match v {
            ParameterValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn read_bool(&self, name: &str, default: bool) -> bool {
        self.read_with(name, default, "bool", |v| match v {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn read_i64(&self, name: &str, default: i64) -> i64 {
        self.read_with(name, default, "int", |v| match v {
            ParameterValue::Int(i) => Some(*i),
            _ => None,
        })
    }

    /// Reads an int that must fit an `i32`.
    pub fn read_i32(&self, name: &str, default: i32) -> i32 {
        self.read_with(name, default, "int", |v| match v {
            ParameterValue::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        })
    }

    pub fn read_usize(&self, name: &str, default: usize) -> usize {
        self.read_with(name, default, "non-negative int", |v| match v {
            ParameterValue::Int(i) => usize::try_from(*i).ok(),
            _ => None,
        })
    }

    /// Reads a float; an int value is accepted and widened.
    pub fn read_f64(&self, name: &str, default: f64) -> f64 {
        self.read_with(name, default, "float", |v| match v {
            ParameterValue::Float(f) => Some(*f),
            ParameterValue::Int(i) => Some(*i as f64),
            _ => None,
        })
    }

    pub fn read_f32(&self, name: &str, default: f32) -> f32 {
        self.read_f64(name, default.into()) as f32
    }

    pub fn read_int_vector(&self, name: &str, default: Vec<i64>) -> Vec<i64> {
        self.read_with(name, default, "int_vector", |v| match v {
            ParameterValue::IntVector(items) => Some(items.clone()),
            _ => None,
        })
    }

    pub fn read_usize_vector(&self, name: &str, default: Vec<usize>) -> Vec<usize> {
        self.read_with(name, default, "int_vector of non-negative ints", |v| match v {
            ParameterValue::IntVector(items) => {
                items.iter().map(|&i| usize::try_from(i).ok()).collect()
            }
            _ => None,
        })
    }

    pub fn read_float_vector(&self, name: &str, default: Vec<f64>) -> Vec<f64> {
        self.read_with(name, default, "float_vector", |v| match v {
            ParameterValue::FloatVector(items) => Some(items.clone()),
            _ => None,
        })
    }

    pub fn read_int_vec3(&self, name: &str, default: [i32; 3]) -> [i32; 3] {
        self.read_with(name, default, "int_vec3", |v| match v {
            ParameterValue::IntVec3(xyz) => Some(*xyz),
            _ => None,
        })
    }

    pub fn read_float_vec3(&self, name: &str, default: [f32; 3]) -> [f32; 3] {
        self.read_with(name, default, "float_vec3", |v| match v {
            ParameterValue::FloatVec3(xyz) => Some(*xyz),
            _ => None,
        })
    }

    pub fn read_second_order_polynomial(&self, name: &str, default: [f32; 6]) -> [f32; 6] {
        self.read_with(name, default, "second_order_polynomial", |v| match v {
            ParameterValue::SecondOrderPolynomial(c) => Some(*c),
            _ => None,
        })
    }

    pub fn read_third_order_polynomial(&self, name: &str, default: [f32; 10]) -> [f32; 10] {
        self.read_with(name, default, "third_order_polynomial", |v| match v {
            ParameterValue::ThirdOrderPolynomial(c) => Some(*c),
            _ => None,
        })
    }

    pub fn read_fourth_order_polynomial(&self, name: &str, default: [f32; 15]) -> [f32; 15] {
        self.read_with(name, default, "fourth_order_polynomial", |v| match v {
            ParameterValue::FourthOrderPolynomial(c) => Some(*c),
            _ => None,
        })
    }

    pub fn read_axis_angle(&self, name: &str, default: AxisAngleInput) -> AxisAngleInput {
        self.read_with(name, default, "axis_angle", |v| match v {
            ParameterValue::AxisAngle(a) => Some(*a),
            _ => None,
        })
    }

    pub fn read_axis_angles(&self, name: &str, default: Vec<AxisAngleInput>) -> Vec<AxisAngleInput> {
        self.read_with(name, default, "axis_angles", |v| match v {
            ParameterValue::AxisAngles(a) => Some(a.clone()),
            _ => None,
        })
    }

    pub fn read_file_list(&self, name: &str, default: FileListInfo) -> FileListInfo {
        self.read_with(name, default, "file_list", |v| match v {
            ParameterValue::FileList(info) => Some(info.clone()),
            _ => None,
        })
    }

    /// Reads a path; the `container|matrix|array` string form is accepted too.
    pub fn read_path(&self, name: &str, default: DataArrayPath) -> DataArrayPath {
        self.read_with(name, default, "path", |v| match v {
            ParameterValue::Path(p) => Some(p.clone()),
            ParameterValue::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn read_paths(&self, name: &str, default: Vec<DataArrayPath>) -> Vec<DataArrayPath> {
        self.read_with(name, default, "paths", |v| match v {
            ParameterValue::Paths(p) => Some(p.clone()),
            _ => None,
        })
    }

    pub fn read_table(&self, name: &str, default: DynamicTableData) -> DynamicTableData {
        self.read_with(name, default, "table", |v| match v {
            ParameterValue::Table(t) if t.validate().is_ok() => Some(t.clone()),
            _ => None,
        })
    }

    /// Reads an element kind; its name as a string is accepted too.
    pub fn read_element_kind(&self, name: &str, default: ElementKind) -> ElementKind {
        self.read_with(name, default, "element_kind", |v| match v {
            ParameterValue::ElementKind(k) => Some(*k),
            ParameterValue::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn read_category(&self, name: &str, default: MatrixCategory) -> MatrixCategory {
        self.read_with(name, default, "category", |v| match v {
            ParameterValue::Category(c) => Some(*c),
            _ => None,
        })
    }
}

impl From<ParameterWriter> for ParameterReader {
    fn from(writer: ParameterWriter) -> Self {
        Self::new(writer.into_values())
    }
}
