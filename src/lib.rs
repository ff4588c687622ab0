//! This file is the root of the `strata` crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`arrays`, `filter`,
//!     `pipeline`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types most callers need, so a pipeline can be
//!     assembled with a single `use strata::*`-style import.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
/// Recorded in the header of every file this crate writes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod arrays;
pub mod config;
pub mod containers;
pub mod error;
pub mod filter;
pub mod filters;
pub mod geometry;
pub mod persistence;
pub mod pipeline;
pub mod traits;
pub mod types;
pub mod utils;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use arrays::{AnyArray, ArrayInfo, DynamicListArray, TypedArray};
pub use config::StrataConfig;
pub use containers::{
    AttributeMatrix, DataArrayPath, DataContainer, DataContainerArray, MatrixCategory,
};
pub use error::{Result, StrataError};
pub use filter::{CancelToken, Filter, FilterRegistry, Mode};
pub use geometry::{Geometry, ImageGeom, MeshGeometry, MeshKind};
pub use pipeline::{Pipeline, PipelineReport, PipelineStatus};
pub use traits::Element;
pub use types::ElementKind;
