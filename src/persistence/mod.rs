//! The persisted mirror of the container hierarchy and the stored pipeline
//! definition.

pub mod artifact;
pub mod codec;
pub mod format;
pub mod pipeline_file;
pub mod schema;

#[cfg(test)]
mod persistence_tests;

pub use artifact::{
    peek_file_header, peek_header, peek_schema, read_data_container_array, read_file,
    write_data_container_array, write_file, ReadOutcome,
};
pub use format::{FileHeader, PayloadEntry, PayloadKey};
pub use pipeline_file::{
    read_pipeline_file, write_pipeline_file, FilterEntry, LoadedPipeline, PipelineDocument,
    SkippedEntry,
};
pub use schema::{ArraySchema, ContainerSchema, DataContainerArraySchema, GeometrySchema, MatrixSchema};
