//! This module defines the core, strongly-typed scalar representations used
//! throughout strata.
//!
//! It includes the canonical `ElementKind` enum, the closed set of scalar kinds a
//! `TypedArray` may hold, and the dispatch macros that turn a runtime kind back
//! into a concrete Rust type exactly once per call.

pub mod dispatch;
pub mod element_kind;

// Re-export the main type(s) for easier access.
pub use element_kind::ElementKind;
