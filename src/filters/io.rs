// In: src/filters/io.rs

//! Filters that move a `DataContainerArray` to and from a strata file.

use std::path::PathBuf;

use crate::containers::{DataArrayPath, DataContainerArray};
use crate::error::{codes, Result, StrataError};
use crate::filter::{
    DataCheck, ExecuteContext, Filter, FilterState, Mode, ParameterReader, ParameterWriter,
};
use crate::persistence::{peek_file_header, read_file, write_file};

//==================================================================================
// --- DataContainerReader ---
//==================================================================================

/// Imports the containers stored in a file.
///
/// Preflight reads only the file header and merges its structure as
/// unallocated arrays. Execute reads and merges the selected payloads.
#[derive(Debug, Clone, Default)]
pub struct DataContainerReader {
    pub input_file: PathBuf,
    pub overwrite_existing: bool,
    /// Empty selects everything in the file.
    pub selection: Vec<DataArrayPath>,
    state: FilterState,
}

impl DataContainerReader {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            ..Self::default()
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn with_selection(mut self, selection: Vec<DataArrayPath>) -> Self {
        self.selection = selection;
        self
    }
}

impl Filter for DataContainerReader {
    fn class_name(&self) -> &'static str {
        "DataContainerReader"
    }

    fn human_label(&self) -> &'static str {
        "Read Strata File"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        if self.input_file.as_os_str().is_empty() {
            check.error(StrataError::InvalidParameter("an input file is required".into()));
            return;
        }
        match check.mode() {
            Mode::Preflight => {
                let Some(outcome) = check.check(read_file(&self.input_file, Mode::Preflight, &self.selection)) else {
                    return;
                };
                for warning in outcome.warnings {
                    check.warning(codes::IO, warning);
                }
                check.import(outcome.dca, self.overwrite_existing);
            }
            Mode::Execute => {
                let Some(header) = check.check(peek_file_header(&self.input_file)) else {
                    return;
                };
                if self.overwrite_existing {
                    return;
                }
                let schema = header.schema.select(&self.selection);
                if let Some(name) = schema
                    .containers
                    .iter()
                    .map(|c| c.name.as_str())
                    .find(|name| check.dca().contains_container(name))
                {
                    check.error(StrataError::AlreadyExists(format!("Data container '{}'", name)));
                }
            }
        }
    }

    fn compute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> Result<()> {
        let outcome = read_file(&self.input_file, Mode::Execute, &self.selection)?;
        if ctx.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        let count = outcome.dca.container_names().len();
        dca.merge_from(outcome.dca, self.overwrite_existing)?;
        log::info!(
            "imported {} data containers from {}",
            count,
            self.input_file.display()
        );
        Ok(())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("InputFile", self.input_file.to_string_lossy().into_owned());
        writer.write("OverwriteExistingDataContainers", self.overwrite_existing);
        writer.write("SelectedArrays", self.selection.clone());
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        let current = self.input_file.to_string_lossy().into_owned();
        self.input_file = PathBuf::from(reader.read_string("InputFile", &current));
        self.overwrite_existing = reader.read_bool("OverwriteExistingDataContainers", self.overwrite_existing);
        self.selection = reader.read_paths("SelectedArrays", self.selection.clone());
    }
}

//==================================================================================
// --- DataContainerWriter ---
//==================================================================================

/// Writes the whole registry to a file, compressed per the run configuration.
#[derive(Debug, Clone, Default)]
pub struct DataContainerWriter {
    pub output_file: PathBuf,
    state: FilterState,
}

impl DataContainerWriter {
    pub fn new(output_file: impl Into<PathBuf>) -> Self {
        Self {
            output_file: output_file.into(),
            state: FilterState::default(),
        }
    }
}

impl Filter for DataContainerWriter {
    fn class_name(&self) -> &'static str {
        "DataContainerWriter"
    }

    fn human_label(&self) -> &'static str {
        "Write Strata File"
    }

    fn state(&self) -> &FilterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FilterState {
        &mut self.state
    }

    fn data_check(&self, check: &mut DataCheck<'_>) {
        if self.output_file.as_os_str().is_empty() {
            check.error(StrataError::InvalidParameter("an output file is required".into()));
            return;
        }
        if let Some(parent) = self.output_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                check.warning(
                    codes::IO,
                    format!("the directory {} does not exist yet", parent.display()),
                );
            }
        }
    }

    fn compute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> Result<()> {
        if let Some(parent) = self.output_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_file(&self.output_file, dca, None, ctx.config())
    }

    fn write_parameters(&self, writer: &mut ParameterWriter) {
        writer.write("OutputFile", self.output_file.to_string_lossy().into_owned());
    }

    fn read_parameters(&mut self, reader: &ParameterReader) {
        let current = self.output_file.to_string_lossy().into_owned();
        self.output_file = PathBuf::from(reader.read_string("OutputFile", &current));
    }
}
