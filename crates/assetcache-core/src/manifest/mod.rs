//! Deployment manifest model.
//!
//! A deployment is described by:
//! - `Manifest`: every cacheable asset path mapped to its content digest
//! - `CoreSet`: the subset of paths fetched eagerly during install
//!
//! Both are produced by the build and never change while a worker runs.

pub mod deployment;
pub mod error;
pub mod resources;

pub use deployment::Deployment;
pub use error::ManifestError;
pub use resources::{normalize_key, CoreSet, Manifest, ROOT_PATH};
