//! Shared types, error model, and configuration for Aragorn.
//!
//! This crate is the foundation depended on by all other Aragorn crates.
//! It provides:
//! - [`AragornError`], the unified error type
//! - Domain types ([`Message`], [`QueryGraph`], [`MergeStrategy`], [`JsonMap`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, Endpoints, ExpansionSource, PipelineConfig, ServicesConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{AragornError, Result};
pub use types::{
    JsonMap, KnowledgeGraph, MergeStrategy, Message, MessageBody, QueryEdge, QueryGraph,
    QueryNode,
};
