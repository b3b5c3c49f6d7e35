//! Shared types, error model, and configuration for WikiForge.
//!
//! This crate is the foundation depended on by all other WikiForge crates.
//! It provides:
//! - [`WikiForgeError`]: the unified error type
//! - Domain types ([`RunId`], [`ModelConfig`], [`Model`], [`RunStatus`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, NotionConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_secret, validate_credentials,
};
pub use error::{Result, WikiForgeError};
pub use types::{Model, ModelConfig, Phase, RunId, RunStatus, WritingMethod};
