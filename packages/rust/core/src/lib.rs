//! Pipeline orchestration and query construction for Aragorn.
//!
//! This crate ties the service clients together into the end-to-end
//! expand → coalesce → overlay → weight → score workflow.

pub mod pipeline;
pub mod query;
pub mod snapshot;
