//! The stored pipeline definition.
//!
//! Each filter is recorded in execution order as its index, its class name and
//! the named parameters it wrote. Loading resolves class names through a
//! [`FilterRegistry`]; entries without a factory are skipped and reported, never
//! fatal for the pipeline as a whole.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, StrataError};
use crate::filter::{FilterRegistry, ParameterReader, ParameterValue, ParameterWriter};
use crate::pipeline::Pipeline;

pub const PIPELINE_DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FilterEntry {
    pub index: usize,
    pub class_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipelineDocument {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    pub filters: Vec<FilterEntry>,
}

/// An entry that could not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    pub class_name: String,
}

/// The outcome of [`PipelineDocument::build`].
pub struct LoadedPipeline {
    pub pipeline: Pipeline,
    pub skipped: Vec<SkippedEntry>,
}

impl PipelineDocument {
    /// Captures every filter of `pipeline` with its current parameters.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let filters = pipeline
            .filters()
            .iter()
            .enumerate()
            .map(|(index, filter)| {
                let mut writer = ParameterWriter::new();
                filter.write_parameters(&mut writer);
                FilterEntry {
                    index,
                    class_name: filter.class_name().to_string(),
                    label: filter.human_label().to_string(),
                    parameters: writer.into_values(),
                }
            })
            .collect();
        Self {
            version: PIPELINE_DOCUMENT_VERSION,
            name: pipeline.name().to_string(),
            filters,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: PipelineDocument = serde_json::from_str(json)?;
        if document.version > PIPELINE_DOCUMENT_VERSION {
            return Err(StrataError::Format(format!(
                "Unsupported pipeline document version: expected at most {}, got {}",
                PIPELINE_DOCUMENT_VERSION, document.version
            )));
        }
        Ok(document)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Instantiates the filters in index order and replays their parameters.
    pub fn build(&self, registry: &FilterRegistry) -> LoadedPipeline {
        let mut entries: Vec<&FilterEntry> = self.filters.iter().collect();
        entries.sort_by_key(|e| e.index);

        let mut pipeline = Pipeline::new(&self.name);
        let mut skipped = Vec::new();
        for entry in entries {
            match registry.create(&entry.class_name) {
                Some(mut filter) => {
                    filter.read_parameters(&ParameterReader::new(entry.parameters.clone()));
                    pipeline.push_back(filter);
                }
                None => {
                    log::warn!(
                        "No filter factory for '{}' (entry {}); skipping it",
                        entry.class_name,
                        entry.index
                    );
                    skipped.push(SkippedEntry {
                        index: entry.index,
                        class_name: entry.class_name.clone(),
                    });
                }
            }
        }
        LoadedPipeline { pipeline, skipped }
    }
}

pub fn write_pipeline_file(path: &Path, pipeline: &Pipeline) -> Result<()> {
    let json = PipelineDocument::from_pipeline(pipeline).to_json_string()?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_pipeline_file(path: &Path, registry: &FilterRegistry) -> Result<LoadedPipeline> {
    let json = fs::read_to_string(path)?;
    Ok(PipelineDocument::from_json_str(&json)?.build(registry))
}
