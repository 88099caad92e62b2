//! Routing module
//!
//! Maps request paths onto page operations.

pub mod matcher;

pub use matcher::{decode_path, match_path, Operation, PageRoute};
