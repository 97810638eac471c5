//! Small, dependency-light helpers shared across the pipeline.

pub mod date;
pub mod slug;
