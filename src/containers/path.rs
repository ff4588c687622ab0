//! The three-part logical address of an array.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StrataError};

/// Separator used by the textual form `container|matrix|array`.
pub const PATH_SEPARATOR: char = '|';

/// A late-bound lookup key: `(container, matrix, array)`.
///
/// A path owns no storage and may refer to nothing until it is resolved
/// against a `DataContainerArray`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataArrayPath {
    pub container: String,
    pub matrix: String,
    pub array: String,
}

impl DataArrayPath {
    pub fn new(container: &str, matrix: &str, array: &str) -> Self {
        Self {
            container: container.to_string(),
            matrix: matrix.to_string(),
            array: array.to_string(),
        }
    }

    /// A path that addresses a matrix rather than an array.
    pub fn matrix_path(container: &str, matrix: &str) -> Self {
        Self::new(container, matrix, "")
    }

    /// Same container and matrix, different array name.
    pub fn with_array(&self, array: &str) -> Self {
        Self::new(&self.container, &self.matrix, array)
    }

    /// True when all three parts are empty.
    pub fn is_empty(&self) -> bool {
        self.container.is_empty() && self.matrix.is_empty() && self.array.is_empty()
    }

    /// True when all three parts are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.container.is_empty() && !self.matrix.is_empty() && !self.array.is_empty()
    }

    pub fn has_same_container(&self, other: &DataArrayPath) -> bool {
        self.container == other.container
    }

    pub fn has_same_matrix(&self, other: &DataArrayPath) -> bool {
        self.has_same_container(other) && self.matrix == other.matrix
    }

    /// Fails with the path-level validation error, if any.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(StrataError::EmptyPath);
        }
        if !self.is_valid() {
            return Err(StrataError::InvalidPath(self.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for DataArrayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.container,
            self.matrix,
            self.array,
            sep = PATH_SEPARATOR
        )
    }
}

impl FromStr for DataArrayPath {
    type Err = StrataError;

    /// Parses `container|matrix|array`; missing trailing parts are empty.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let parts: Vec<&str> = s.split(PATH_SEPARATOR).collect();
        if parts.len() > 3 {
            return Err(StrataError::InvalidParameter(format!(
                "'{}' has more than three path parts",
                s
            )));
        }
        let part = |i: usize| parts.get(i).copied().unwrap_or("");
        Ok(Self::new(part(0), part(1), part(2)))
    }
}
