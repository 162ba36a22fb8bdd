//! Core types and error handling shared across the crate.

pub mod error;

pub use error::{BundleError, Result};
