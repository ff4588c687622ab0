// In: src/filters/structure.rs

//! Filters that only shape the hierarchy: they create or rename containers,
//! matrices and arrays. All of their work happens in `data_check`, so
//! `compute` is a no-op.

use crate::containers::{DataArrayPath, DataContainerArray, MatrixCategory};
use crate::error::{Result, StrataError};
use crate::filter::{
    DataCheck, ExecuteContext, Filter, FilterState, ParameterReader, ParameterWriter,
};
use crate::types::ElementKind;

//==================================================================================
// --- CreateDataContainer ---
//==================================================================================

#[derive(Debug, Clone, Default)]
pub struct CreateDataContainer {
    pub container: String,
    state: FilterState,
}

impl CreateDataContainer {
    pub fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            state: FilterState::default(),
        }
    }
}

impl Filter for CreateDataContainer {
    fn class_name(&self) -> &'static str {
        "CreateDataContainer"
    }

    fn human_label(&self) -> &'static str {
        "Create Data Container"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        check.create_container(&self.container);
    }

    fn compute(&mut self, _dca: &mut DataContainerArray, _ctx: &mut ExecuteContext<'_>) -> Result<()> {
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("DataContainerName", self.container.as_str());
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.container = reader.read_string("DataContainerName", &self.container);
    }
}

//==================================================================================
// --- CreateAttributeMatrix ---
//==================================================================================

/// Creates an empty matrix. `matrix` is a path whose array part is unused.
#[derive(Debug, Clone)]
pub struct CreateAttributeMatrix {
    pub matrix: DataArrayPath,
    pub tuple_dims: Vec<usize>,
    pub category: MatrixCategory,
    state: FilterState,
}

impl Default for CreateAttributeMatrix {
    fn default() -> Self {
        Self {
            matrix: DataArrayPath::default(),
            tuple_dims: vec![1],
            category: MatrixCategory::Generic,
            state: FilterState::default(),
        }
    }
}

impl CreateAttributeMatrix {
    pub fn new(container: &str, matrix: &str, tuple_dims: Vec<usize>, category: MatrixCategory) -> Self {
        Self {
            matrix: DataArrayPath::matrix_path(container, matrix),
            tuple_dims,
            category,
            state: FilterState::default(),
        }
    }
}

impl Filter for CreateAttributeMatrix {
    fn class_name(&self) -> &'static str {
        "CreateAttributeMatrix"
    }

    fn human_label(&self) -> &'static str {
        "Create Attribute Matrix"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        if self.tuple_dims.is_empty() || self.tuple_dims.contains(&0) {
            check.error(StrataError::InvalidParameter(format!(
                "tuple dimensions {:?} must be non-empty and non-zero",
                self.tuple_dims
            )));
            return;
        }
        check.create_matrix(
            &self.matrix.container,
            &self.matrix.matrix,
            self.tuple_dims.clone(),
            self.category,
        );
    }

    fn compute(&mut self, _dca: &mut DataContainerArray, _ctx: &mut ExecuteContext<'_>) -> Result<()> {
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("CreatedAttributeMatrix", self.matrix.clone());
        writer.write("TupleDimensions", self.tuple_dims.clone());
        writer.write("AttributeMatrixType", self.category);
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.matrix = reader.read_path("CreatedAttributeMatrix", self.matrix.clone());
        self.tuple_dims = reader.read_usize_vector("TupleDimensions", self.tuple_dims.clone());
        self.category = reader.read_category("AttributeMatrixType", self.category);
    }
}

//==================================================================================
// --- CreateDataArray ---
//==================================================================================

/// Adds an array filled with one value to an existing matrix.
#[derive(Debug, Clone)]
pub struct CreateDataArray {
    pub path: DataArrayPath,
    pub kind: ElementKind,
    pub component_dims: Vec<usize>,
    pub init: f64,
    state: FilterState,
}

impl Default for CreateDataArray {
    fn default() -> Self {
        Self {
            path: DataArrayPath::default(),
            kind: ElementKind::Float32,
            component_dims: vec![1],
            init: 0.0,
            state: FilterState::default(),
        }
    }
}

impl CreateDataArray {
    pub fn new(path: DataArrayPath, kind: ElementKind, component_dims: Vec<usize>, init: f64) -> Self {
        Self {
            path,
            kind,
            component_dims,
            init,
            state: FilterState::default(),
        }
    }
}

impl Filter for CreateDataArray {
    fn class_name(&self) -> &'static str {
        "CreateDataArray"
    }

    fn human_label(&self) -> &'static str {
        "Create Data Array"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        check.create_array(&self.path, self.kind, self.component_dims.clone(), self.init);
    }

    fn compute(&mut self, _dca: &mut DataContainerArray, _ctx: &mut ExecuteContext<'_>) -> Result<()> {
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("NewArray", self.path.clone());
        writer.write("ScalarType", self.kind);
        writer.write("ComponentDimensions", self.component_dims.clone());
        writer.write("InitializationValue", self.init);
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.path = reader.read_path("NewArray", self.path.clone());
        self.kind = reader.read_element_kind("ScalarType", self.kind);
        self.component_dims = reader.read_usize_vector("ComponentDimensions", self.component_dims.clone());
        self.init = reader.read_f64("InitializationValue", self.init);
    }
}

//==================================================================================
// --- RenameDataArray ---
//==================================================================================

#[derive(Debug, Clone, Default)]
pub struct RenameDataArray {
    pub path: DataArrayPath,
    pub new_name: String,
    state: FilterState,
}

impl RenameDataArray {
    pub fn new(path: DataArrayPath, new_name: &str) -> Self {
        Self {
            path,
            new_name: new_name.to_string(),
            state: FilterState::default(),
        }
    }
}

impl Filter for RenameDataArray {
    fn class_name(&self) -> &'static str {
        "RenameDataArray"
    }

    fn human_label(&self) -> &'static str {
        "Rename Data Array"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        check.rename_array(&self.path, &self.new_name);
    }

    fn compute(&mut self, _dca: &mut DataContainerArray, _ctx: &mut ExecuteContext<'_>) -> Result<()> {
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("SelectedArrayPath", self.path.clone());
        writer.write("NewArrayName", self.new_name.as_str());
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        self.path = reader.read_path("SelectedArrayPath", self.path.clone());
        self.new_name = reader.read_string("NewArrayName", &self.new_name);
    }
}
