//! Published site addresses derived from the repository identity.
//!
//! The browser client is built against the URL the catalog will be served
//! from once the hosting branch is published:
//! `https://<owner>.github.io/<repo>/catalog.json` with path prefix `/<repo>/`.

use std::fmt;

use url::Url;

use osccat_shared::{CatalogError, Result, SiteConfig};

use crate::assembler::CATALOG_FILE;

/// Repository owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    pub owner: String,
    pub repo: String,
}

impl SiteTarget {
    /// Resolve owner and repo from CLI flags, then config, then the CI
    /// environment (`GITHUB_REPOSITORY_OWNER`, `GITHUB_REPOSITORY`).
    pub fn resolve(
        owner: Option<&str>,
        repo: Option<&str>,
        config: &SiteConfig,
    ) -> Result<Self> {
        Self::resolve_with(owner, repo, config, |key| std::env::var(key).ok())
    }

    /// [`SiteTarget::resolve`] with an injectable environment lookup.
    pub fn resolve_with(
        owner: Option<&str>,
        repo: Option<&str>,
        config: &SiteConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        // GITHUB_REPOSITORY is "owner/name".
        let env_repository = env("GITHUB_REPOSITORY")
            .and_then(|full| full.split_once('/').map(|(o, r)| (o.to_string(), r.to_string())));

        let owner = owner
            .map(String::from)
            .or_else(|| config.owner.clone())
            .or_else(|| env("GITHUB_REPOSITORY_OWNER"))
            .or_else(|| env_repository.as_ref().map(|(o, _)| o.clone()))
            .ok_or_else(|| {
                CatalogError::config(
                    "repository owner unknown: pass --owner, set [site].owner, \
                     or set GITHUB_REPOSITORY_OWNER",
                )
            })?;

        let repo = repo
            .map(String::from)
            .or_else(|| config.repo.clone())
            .or_else(|| env_repository.map(|(_, r)| r))
            .ok_or_else(|| {
                CatalogError::config(
                    "repository name unknown: pass --repo, set [site].repo, \
                     or set GITHUB_REPOSITORY",
                )
            })?;

        let target = Self { owner, repo };
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> Result<()> {
        for (what, value) in [("owner", &self.owner), ("repo", &self.repo)] {
            if value.trim().is_empty() {
                return Err(CatalogError::validation(format!("repository {what} is empty")));
            }
            if value.contains(['/', ' ', '?', '#']) {
                return Err(CatalogError::validation(format!(
                    "repository {what} '{value}' contains invalid characters"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SiteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The two values passed to the client build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    /// Absolute URL of the published `catalog.json`.
    pub catalog_url: Url,
    /// URL path under which the site is served, with leading and trailing `/`.
    pub path_prefix: String,
}

impl SiteUrls {
    /// Derive the published catalog URL and path prefix.
    ///
    /// A repository named `<owner>.github.io` is served from the domain root.
    pub fn derive(target: &SiteTarget) -> Result<Self> {
        let host = format!("{}.github.io", target.owner.to_lowercase());

        let path_prefix = if target.repo.eq_ignore_ascii_case(&host) {
            "/".to_string()
        } else {
            format!("/{}/", target.repo)
        };

        let raw = format!("https://{host}{path_prefix}{CATALOG_FILE}");
        let catalog_url = Url::parse(&raw)
            .map_err(|e| CatalogError::validation(format!("invalid catalog URL '{raw}': {e}")))?;

        Ok(Self {
            catalog_url,
            path_prefix,
        })
    }

    /// Build arguments in the form the client's build script expects.
    pub fn build_args(&self) -> [String; 2] {
        [
            format!("--catalogUrl={}", self.catalog_url),
            format!("--pathPrefix={}", self.path_prefix),
        ]
    }
}
