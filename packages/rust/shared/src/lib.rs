//! Shared types, error model, and configuration for teamscrape.
//!
//! This crate is the foundation depended on by all other teamscrape crates.
//! It provides:
//! - [`TeamScrapeError`]: the unified error type
//! - Domain records ([`SeedRecord`], [`ResolvedPage`], [`PersonRecord`], [`ConsolidatedRow`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DirectoryConfig, HttpConfig, LlmConfig, RunConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TeamScrapeError};
pub use types::{ConsolidatedRow, PersonRecord, ResolvedPage, SeedRecord, TeamMember};
