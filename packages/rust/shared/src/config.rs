//! Application configuration for the OSC catalog tools.
//!
//! Config is looked up at `--config`, then `./osccat.toml`, then
//! `~/.osccat/osccat.toml`. CLI flags override config file values, which
//! override environment values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "osccat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".osccat";

// ---------------------------------------------------------------------------
// Config structs (matching osccat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog identity and output settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// CSV input locations.
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Browser client build settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Repository identity used to derive published URLs.
    #[serde(default)]
    pub site: SiteConfig,

    /// Static hosting branch settings.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Root catalog identifier.
    #[serde(default = "default_catalog_id")]
    pub id: String,

    /// Root catalog description.
    #[serde(default = "default_catalog_id")]
    pub description: String,

    /// Optional root catalog title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Output directory for generated documents.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Treat unresolved theme/variable references as errors.
    #[serde(default)]
    pub strict: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            id: default_catalog_id(),
            description: default_catalog_id(),
            title: None,
            out_dir: default_out_dir(),
            strict: false,
        }
    }
}

fn default_catalog_id() -> String {
    "OSC-Catalog".into()
}
fn default_out_dir() -> String {
    "dist".into()
}

/// `[inputs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_variables")]
    pub variables: String,
    #[serde(default = "default_themes")]
    pub themes: String,
    #[serde(default = "default_projects")]
    pub projects: String,
    #[serde(default = "default_products")]
    pub products: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            variables: default_variables(),
            themes: default_themes(),
            projects: default_projects(),
            products: default_products(),
        }
    }
}

fn default_variables() -> String {
    "Variables.csv".into()
}
fn default_themes() -> String {
    "Themes.csv".into()
}
fn default_projects() -> String {
    "Projects-2021-12-20.csv".into()
}
fn default_products() -> String {
    "Products-2021-12-20.csv".into()
}

/// `[client]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory of the browser client project (a git submodule).
    #[serde(default = "default_client_dir")]
    pub dir: String,

    /// npm executable.
    #[serde(default = "default_npm")]
    pub npm: String,

    /// Build output directory, relative to `dir`.
    #[serde(default = "default_out_dir")]
    pub dist_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dir: default_client_dir(),
            npm: default_npm(),
            dist_dir: default_out_dir(),
        }
    }
}

fn default_client_dir() -> String {
    "stac-browser".into()
}
fn default_npm() -> String {
    "npm".into()
}

/// `[site]` section. Unset values fall back to the CI environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Repository owner (user or organization).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Publish after a successful build.
    #[serde(default)]
    pub enabled: bool,

    /// Static hosting branch.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Git remote URL. Defaults to the `origin` remote of the working tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            branch: default_branch(),
            remote: None,
            commit_message: default_commit_message(),
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

fn default_branch() -> String {
    "gh-pages".into()
}
fn default_commit_message() -> String {
    "Publish catalog".into()
}
fn default_author_name() -> String {
    "osccat".into()
}
fn default_author_email() -> String {
    "osccat@users.noreply.github.com".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.osccat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.osccat/osccat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Pick the config file to load, if any.
///
/// An explicit path must exist. Otherwise `./osccat.toml` is preferred over
/// the user config file.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CatalogError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    // A missing home directory only means there is no user config.
    match config_file_path() {
        Ok(path) if path.exists() => Ok(Some(path)),
        _ => Ok(None),
    }
}

/// Load the application config. Returns defaults if no config file is found.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match resolve_config_path(explicit)? {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CatalogError::config(format!("failed to parse {}: {e}", path.display())))?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Write a default config file to `path`. Refuses to overwrite.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(CatalogError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CatalogError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| CatalogError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(())
}
