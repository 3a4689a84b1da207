//! Shared types and collaborator interfaces
//!
//! `types` holds the data model, `traits` the capabilities the engine is
//! handed at construction, `memory` in-process implementations of them.

pub mod types;
pub mod traits;
pub mod memory;
