//! Domain-level building blocks shared by the API, storage and panel crates.
//!
//! Entities mirror the rows of the external datastore; the storage traits
//! describe the handful of reads and writes the relay performs against it.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use model::*;
pub use storage::*;
