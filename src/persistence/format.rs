//! Defines the constants and header records of the strata file format.
//!
//! Layout of a file:
//!
//! ```text
//! magic "STRF" (4) | version u16 LE (2) | header_len u32 LE (4) | header JSON | payloads
//! ```
//!
//! The JSON header carries the full structural schema, a manifest locating each
//! payload, and optionally the pipeline definition. Reading the header alone is
//! enough for preflight.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::containers::DataArrayPath;
use crate::persistence::pipeline_file::PipelineDocument;
use crate::persistence::schema::DataContainerArraySchema;

pub const FILE_MAGIC: &[u8; 4] = b"STRF";
pub const FILE_FORMAT_VERSION: u16 = 1;
/// Stored in every array schema; bumped when the per-array layout changes.
pub const ARRAY_FORMAT_VERSION: i32 = 2;
/// magic(4) + version(2) + header_len(4)
pub const PREAMBLE_SIZE: usize = 10;
/// Guards against allocating for a corrupt header length. (64MB)
pub const MAX_HEADER_LEN: usize = 64 * 1024 * 1024;

/// What one payload holds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadKey {
    Array { path: DataArrayPath },
    GeometryVertices { container: String },
    GeometryElements { container: String },
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKey::Array { path } => write!(f, "data array '{}'", path),
            PayloadKey::GeometryVertices { container } => {
                write!(f, "vertex list of data container '{}'", container)
            }
            PayloadKey::GeometryElements { container } => {
                write!(f, "element list of data container '{}'", container)
            }
        }
    }
}

/// Locates one payload inside the payload section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PayloadEntry {
    pub key: PayloadKey,
    /// Byte offset from the start of the payload section.
    pub offset: u64,
    pub stored_size: u64,
    pub compressed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub writer_version: String,
    pub schema: DataContainerArraySchema,
    pub manifest: Vec<PayloadEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineDocument>,
}

impl FileHeader {
    pub fn entry(&self, key: &PayloadKey) -> Option<&PayloadEntry> {
        self.manifest.iter().find(|e| &e.key == key)
    }
}
