//! Publishing a built directory to a static hosting branch.
//!
//! The directory is committed as the single commit of a throwaway repository
//! and force-pushed to the branch, replacing whatever was served before.

use std::path::Path;

use tracing::{info, instrument, warn};
use url::Url;

use osccat_shared::{CatalogError, PublishConfig, Result};

use crate::assembler::dir_is_non_empty;
use crate::runner::{CommandRunner, CommandSpec};

/// Marker that stops the hosting service from running Jekyll over the site.
const NOJEKYLL: &str = ".nojekyll";

/// Resolved publishing options.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub branch: String,
    /// Remote URL; `None` means the `origin` of the working tree.
    pub remote: Option<String>,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
    /// Token injected into HTTPS remotes (`GITHUB_TOKEN` in CI).
    pub token: Option<String>,
}

impl From<&PublishConfig> for PublishOptions {
    fn from(config: &PublishConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            remote: config.remote.clone(),
            commit_message: config.commit_message.clone(),
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
            token: None,
        }
    }
}

/// Outcome of a publish.
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub branch: String,
    /// Remote with any credentials removed.
    pub remote: String,
}

/// Commit `dir` to `options.branch` and force-push it.
#[instrument(skip_all, fields(dir = %dir.display(), branch = %options.branch))]
pub async fn publish_dir<R: CommandRunner>(
    dir: &Path,
    options: &PublishOptions,
    runner: &R,
) -> Result<PublishResult> {
    if !dir_is_non_empty(dir)? {
        return Err(CatalogError::validation(format!(
            "refusing to publish empty directory {}",
            dir.display()
        )));
    }

    // The directory may be a real checkout; its history must survive.
    let git_dir = dir.join(".git");
    if git_dir.exists() {
        return Err(CatalogError::validation(format!(
            "refusing to publish {}: it already contains a .git entry",
            dir.display()
        )));
    }

    let remote = match &options.remote {
        Some(remote) => remote.clone(),
        None => {
            runner
                .output(&CommandSpec::new("git").args(["remote", "get-url", "origin"]))
                .await?
        }
    };
    let push_remote = authenticated_remote(&remote, options.token.as_deref())?;
    let shown_remote = redact(&remote);

    let marker = dir.join(NOJEKYLL);
    std::fs::write(&marker, "").map_err(|e| CatalogError::io(&marker, e))?;

    let git = |args: &[&str]| CommandSpec::new("git").args(args.iter().copied()).current_dir(dir);
    let author_name = format!("user.name={}", options.author_name);
    let author_email = format!("user.email={}", options.author_email);

    let steps = [
        git(&["init", "--quiet"]),
        git(&["checkout", "--quiet", "--orphan", options.branch.as_str()]),
        git(&["add", "--all"]),
        git(&[
            "-c",
            author_name.as_str(),
            "-c",
            author_email.as_str(),
            "commit",
            "--quiet",
            "--message",
            options.commit_message.as_str(),
        ]),
    ];

    let mut outcome = Ok(());
    for step in &steps {
        outcome = runner.run(step).await;
        if outcome.is_err() {
            break;
        }
    }
    if outcome.is_ok() {
        let mut push = CommandSpec::new("git")
            .args(["push", "--quiet", "--force", push_remote.as_str()])
            .arg(format!("HEAD:refs/heads/{}", options.branch))
            .current_dir(dir);
        if let Some(token) = &options.token {
            push = push.secret(token);
        }
        outcome = runner.run(&push).await.map_err(|_| {
            CatalogError::command_failed("git push", format!("push to {shown_remote} failed"))
        });
    }

    if let Err(e) = remove_git_dir(&git_dir) {
        warn!(error = %e, "could not remove temporary git directory");
    }
    outcome?;

    info!(remote = %shown_remote, branch = %options.branch, "published");

    Ok(PublishResult {
        branch: options.branch.clone(),
        remote: shown_remote,
    })
}

/// Inject `x-access-token:<token>` credentials into an HTTPS remote.
///
/// SSH and scp-style remotes are returned unchanged.
pub fn authenticated_remote(remote: &str, token: Option<&str>) -> Result<String> {
    let remote = remote.trim();
    if remote.is_empty() {
        return Err(CatalogError::config("publish remote is empty"));
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(remote.to_string());
    };
    if !remote.starts_with("https://") {
        return Ok(remote.to_string());
    }

    let mut url = Url::parse(remote)
        .map_err(|e| CatalogError::config(format!("invalid publish remote '{remote}': {e}")))?;
    url.set_username("x-access-token")
        .and_then(|_| url.set_password(Some(token)))
        .map_err(|_| CatalogError::config(format!("cannot add credentials to '{remote}'")))?;

    Ok(url.to_string())
}

/// Strip credentials from a remote for display.
pub fn redact(remote: &str) -> String {
    match Url::parse(remote) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => remote.to_string(),
    }
}

fn remove_git_dir(git_dir: &Path) -> Result<()> {
    if git_dir.exists() {
        std::fs::remove_dir_all(git_dir).map_err(|e| CatalogError::io(git_dir, e))?;
    }
    Ok(())
}
