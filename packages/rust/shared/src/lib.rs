//! Shared types, error model, and configuration for the OSC catalog tools.
//!
//! This crate is the foundation depended on by all other osccat crates.
//! It provides:
//! - [`CatalogError`]: the unified error type
//! - STAC document types ([`Catalog`], [`Collection`], [`Item`], [`Link`], [`Geometry`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CatalogConfig, ClientConfig, InputsConfig, PublishConfig,
    SiteConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_config_path,
};
pub use error::{CatalogError, Result};
pub use types::{
    Catalog, Collection, DocumentHeader, Extent, ExtraFields, Geometry, Item, Link, OscType,
    Position, RelType, SCIENTIFIC_EXTENSION, STAC_VERSION,
};
