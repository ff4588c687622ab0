// In: src/error.rs

//! This module defines the single, unified error type for the entire strata library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every variant maps onto one stable negative integer (see [`codes`]). Filters
//! store that integer as their last error code, and tooling keys off it to tell
//! failure causes apart, so the numbers are part of the public contract.

use crate::containers::DataArrayPath;
use crate::types::ElementKind;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StrataError>;

//==================================================================================
// 0. Error Codes
//==================================================================================

/// Numeric error codes. Negative means failure, `0` means "no condition".
///
/// Codes are grouped by block: `-80xxx` prerequisite resolution, `-81xxx`
/// topology/creation, `-82xxx` storage, `-83xxx` range, `-84xxx` mesh structure,
/// `-85xxx` persistence, `-86xxx` run control.
pub mod codes {
    pub const NO_ERROR: i32 = 0;

    // --- Prerequisite resolution ---
    pub const EMPTY_PATH: i32 = -80000;
    pub const INVALID_PATH: i32 = -80001;
    pub const CONTAINER_MISSING: i32 = -80002;
    pub const MATRIX_MISSING: i32 = -80003;
    pub const ARRAY_MISSING: i32 = -80004;
    pub const KIND_MISMATCH: i32 = -80005;
    pub const COMPONENT_MISMATCH: i32 = -80006;
    pub const TUPLE_COUNT_MISMATCH: i32 = -80007;
    pub const GEOMETRY_MISSING: i32 = -80008;
    pub const GEOMETRY_MISMATCH: i32 = -80009;

    // --- Topology / creation ---
    pub const EMPTY_NAME: i32 = -81000;
    pub const ALREADY_EXISTS: i32 = -81001;
    pub const SOURCE_MISSING: i32 = -81002;
    pub const TARGET_EXISTS: i32 = -81003;
    pub const INVALID_PARAMETER: i32 = -81004;

    // --- Storage ---
    pub const ALLOCATION: i32 = -82000;
    pub const INDEX_OUT_OF_RANGE: i32 = -82001;

    // --- Value range ---
    pub const RANGE: i32 = -83000;

    // --- Mesh structure ---
    pub const STRUCTURAL: i32 = -84000;

    // --- Persistence ---
    pub const IO: i32 = -85000;
    pub const FORMAT: i32 = -85001;
    pub const SERDE: i32 = -85002;
    pub const COMPRESSION: i32 = -85003;

    // --- Run control ---
    pub const CANCELLED: i32 = -86000;
    pub const INTERNAL: i32 = -89999;
}

//==================================================================================
// 1. The Error Enum
//==================================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrataError {
    // =========================================================================
    // === Validation Errors (prerequisite resolution and naming)
    // =========================================================================
    #[error("The data array path is empty")]
    EmptyPath,

    #[error("The data array path '{0}' is invalid: container, matrix and array names are all required")]
    InvalidPath(DataArrayPath),

    #[error("The data container '{container}' does not exist")]
    ContainerMissing { container: String },

    #[error("The attribute matrix '{matrix}' does not exist in data container '{container}'")]
    MatrixMissing { container: String, matrix: String },

    #[error("The data array '{0}' does not exist")]
    ArrayMissing(DataArrayPath),

    #[error("The data array '{path}' has element kind {found}, but {expected} is required")]
    KindMismatch {
        path: DataArrayPath,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("The data array '{path}' has component dimensions {found:?}, but {expected:?} are required")]
    ComponentMismatch {
        path: DataArrayPath,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("The required data arrays do not share a tuple count: {}", format_tuple_counts(.entries))]
    TupleCountMismatch { entries: Vec<(DataArrayPath, usize)> },

    #[error("Attribute matrix '{matrix}' declares {expected} tuples but arrays {arrays:?} disagree")]
    MatrixSizeMismatch {
        matrix: String,
        expected: usize,
        arrays: Vec<String>,
    },

    #[error("The data container '{container}' has no geometry")]
    GeometryMissing { container: String },

    #[error("The data container '{container}' has geometry {found}, but {expected} is required")]
    GeometryMismatch {
        container: String,
        expected: String,
        found: String,
    },

    #[error("A name is required for the {0}")]
    EmptyName(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Cannot rename '{0}': it does not exist")]
    SourceMissing(String),

    #[error("Cannot rename to '{0}': the target already exists")]
    TargetExists(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // =========================================================================
    // === Storage, Range and Structure Errors
    // =========================================================================
    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Index {index} is out of range for a length of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The value {value} cannot be represented by element kind {kind}")]
    Range { value: f64, kind: ElementKind },

    #[error("Degenerate or non-manifold mesh: {0}")]
    Structural(String),

    // =========================================================================
    // === Persistence Errors (foreign errors are flattened to strings)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem, or a persisted
    /// group/array that is missing or truncated.
    #[error("I/O error: {0}")]
    Io(String),

    #[error("File format error: {0}")]
    Format(String),

    /// An error from the Serde JSON library, typically during header or
    /// pipeline-document serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(String),

    #[error("Zstd operation failed: {0}")]
    Compression(String),

    // =========================================================================
    // === Run Control
    // =========================================================================
    #[error("The operation was cancelled")]
    Cancelled,

    #[error("Internal logic error (this is a bug): {0}")]
    Internal(String),
}

impl StrataError {
    /// The stable numeric code for this error.
    pub fn code(&self) -> i32 {
        use StrataError::*;
        match self {
            EmptyPath => codes::EMPTY_PATH,
            InvalidPath(_) => codes::INVALID_PATH,
            ContainerMissing { .. } => codes::CONTAINER_MISSING,
            MatrixMissing { .. } => codes::MATRIX_MISSING,
            ArrayMissing(_) => codes::ARRAY_MISSING,
            KindMismatch { .. } => codes::KIND_MISMATCH,
            ComponentMismatch { .. } => codes::COMPONENT_MISMATCH,
            TupleCountMismatch { .. } | MatrixSizeMismatch { .. } => codes::TUPLE_COUNT_MISMATCH,
            GeometryMissing { .. } => codes::GEOMETRY_MISSING,
            GeometryMismatch { .. } => codes::GEOMETRY_MISMATCH,
            EmptyName(_) => codes::EMPTY_NAME,
            AlreadyExists(_) => codes::ALREADY_EXISTS,
            SourceMissing(_) => codes::SOURCE_MISSING,
            TargetExists(_) => codes::TARGET_EXISTS,
            InvalidParameter(_) => codes::INVALID_PARAMETER,
            Allocation(_) => codes::ALLOCATION,
            IndexOutOfRange { .. } => codes::INDEX_OUT_OF_RANGE,
            Range { .. } => codes::RANGE,
            Structural(_) => codes::STRUCTURAL,
            Io(_) => codes::IO,
            Format(_) => codes::FORMAT,
            SerdeJson(_) => codes::SERDE,
            Compression(_) => codes::COMPRESSION,
            Cancelled => codes::CANCELLED,
            Internal(_) => codes::INTERNAL,
        }
    }

    /// True for the validation family, which never leaves partial mutations behind.
    pub fn is_validation(&self) -> bool {
        (-81999..=-80000).contains(&self.code())
    }
}

fn format_tuple_counts(entries: &[(DataArrayPath, usize)]) -> String {
    entries
        .iter()
        .map(|(path, count)| format!("'{}' ({} tuples)", path, count))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::SerdeJson(err.to_string())
    }
}

impl From<bytemuck::PodCastError> for StrataError {
    fn from(err: bytemuck::PodCastError) -> Self {
        StrataError::Format(format!("Byte slice casting error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negative_and_distinct() {
        let errors = vec![
            StrataError::EmptyPath,
            StrataError::InvalidPath(DataArrayPath::new("a", "", "")),
            StrataError::ContainerMissing { container: "a".into() },
            StrataError::MatrixMissing { container: "a".into(), matrix: "b".into() },
            StrataError::ArrayMissing(DataArrayPath::new("a", "b", "c")),
            StrataError::Allocation("x".into()),
            StrataError::Range { value: 300.0, kind: ElementKind::UInt8 },
            StrataError::Structural("x".into()),
            StrataError::Io("x".into()),
            StrataError::Cancelled,
        ];
        let mut seen = std::collections::HashSet::new();
        for err in &errors {
            assert!(err.code() < 0, "{:?} must have a negative code", err);
            assert!(seen.insert(err.code()), "{:?} reuses a code", err);
        }
    }

    #[test]
    fn test_tuple_mismatch_message_lists_every_path() {
        let err = StrataError::TupleCountMismatch {
            entries: vec![
                (DataArrayPath::new("dc", "am", "a"), 10),
                (DataArrayPath::new("dc", "am", "b"), 12),
                (DataArrayPath::new("dc", "other", "c"), 10),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("dc|am|a"));
        assert!(msg.contains("dc|am|b"));
        assert!(msg.contains("dc|other|c"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StrataError = io.into();
        assert_eq!(err.code(), codes::IO);
        assert!(err.to_string().contains("gone"));
    }
}
