//! End-to-end pipelines.
//!
//! `generate`: CSV tables → tree → summaries → rendered documents → output dir.
//!
//! `site`: preflight → generate → client build → stage → publish. Every step
//! checks its output before the next one starts, and the first failure aborts
//! the rest.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use osccat_shared::{CatalogError, ClientConfig, Result};
use osccat_sources::{InputPaths, load_tables};

use crate::assembler::{
    CATALOG_FILE, WrittenDocument, dir_is_non_empty, prepare_output_dir, render, write_documents,
};
use crate::builder::{BuildOptions, Unresolved, build_tree};
use crate::publish::{PublishOptions, PublishResult, publish_dir};
use crate::runner::{CommandRunner, CommandSpec};
use crate::site::SiteUrls;
use crate::summary::summarize;

/// Configuration for [`generate_catalog`].
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub inputs: InputPaths,
    pub out_dir: PathBuf,
    pub build: BuildOptions,
    /// Replace a previous catalog in a non-empty output directory.
    pub overwrite: bool,
}

/// Result of [`generate_catalog`].
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub out_dir: PathBuf,
    pub themes: usize,
    pub variables: usize,
    pub products: usize,
    pub projects: usize,
    pub documents: Vec<WrittenDocument>,
    /// SHA-256 of the written `catalog.json`.
    pub catalog_sha256: String,
    pub unresolved: Unresolved,
    pub elapsed: Duration,
}

/// Generate the catalog from the four CSV tables.
#[instrument(skip_all, fields(out_dir = %config.out_dir.display()))]
pub fn generate_catalog(config: &GenerateConfig) -> Result<GenerateResult> {
    let start = Instant::now();

    let tables = load_tables(&config.inputs)?;
    let mut tree = build_tree(&tables, &config.build)?;
    let metrics = summarize(&mut tree);
    let docs = render(&tree, &metrics)?;

    prepare_output_dir(&config.out_dir, config.overwrite)?;
    let documents = write_documents(&config.out_dir, &docs)?;

    let catalog_sha256 = documents
        .iter()
        .find(|d| d.path == CATALOG_FILE)
        .map(|d| d.sha256.clone())
        .unwrap_or_default();

    let result = GenerateResult {
        out_dir: config.out_dir.clone(),
        themes: tree.themes.len(),
        variables: tree.variables.len(),
        products: tree.product_count(),
        projects: tree.projects.len(),
        documents,
        catalog_sha256,
        unresolved: tree.unresolved.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        themes = result.themes,
        variables = result.variables,
        products = result.products,
        projects = result.projects,
        documents = result.documents.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "catalog generated"
    );

    Ok(result)
}

/// A step of the site pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Preflight,
    Generate,
    ClientBuild,
    Stage,
    Publish,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Preflight => "Checking tools",
            Self::Generate => "Generating catalog",
            Self::ClientBuild => "Building browser client",
            Self::Stage => "Staging site",
            Self::Publish => "Publishing",
        })
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a step starts.
    fn step_started(&self, step: Step);
    /// Called when a step completes successfully.
    fn step_finished(&self, step: Step);
    /// Free-form status line within the current step.
    fn message(&self, msg: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &SiteResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn step_started(&self, _step: Step) {}
    fn step_finished(&self, _step: Step) {}
    fn message(&self, _msg: &str) {}
    fn done(&self, _result: &SiteResult) {}
}

/// The browser client project.
#[derive(Debug, Clone)]
pub struct ClientBuild {
    pub dir: PathBuf,
    pub npm: String,
    /// Build output, relative to `dir`.
    pub dist_dir: PathBuf,
}

impl ClientBuild {
    pub fn dist_path(&self) -> PathBuf {
        self.dir.join(&self.dist_dir)
    }
}

impl From<&ClientConfig> for ClientBuild {
    fn from(config: &ClientConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            npm: config.npm.clone(),
            dist_dir: PathBuf::from(&config.dist_dir),
        }
    }
}

/// Configuration for [`run_site`].
#[derive(Debug, Clone)]
pub struct SitePipelineConfig {
    pub generate: GenerateConfig,
    pub client: ClientBuild,
    pub urls: SiteUrls,
    /// Publish the catalog without building the client.
    pub skip_client: bool,
    /// `None` stops after staging.
    pub publish: Option<PublishOptions>,
}

/// Result of [`run_site`].
#[derive(Debug)]
pub struct SiteResult {
    pub generate: GenerateResult,
    pub urls: SiteUrls,
    /// Files copied from the client build into the output directory.
    pub staged_files: usize,
    pub published: Option<PublishResult>,
    pub elapsed: Duration,
}

/// Run the full site pipeline.
///
/// 1. Preflight: required tools respond, client project present
/// 2. Generate the catalog; `catalog.json` must be non-empty
/// 3. Build the client against the derived URLs; its output must be non-empty
/// 4. Copy the client output into the catalog directory
/// 5. Publish the directory (optional)
#[instrument(skip_all, fields(out_dir = %config.generate.out_dir.display()))]
pub async fn run_site<R: CommandRunner>(
    config: &SitePipelineConfig,
    runner: &R,
    progress: &dyn ProgressReporter,
) -> Result<SiteResult> {
    let start = Instant::now();
    let out_dir = &config.generate.out_dir;

    info!(
        catalog_url = %config.urls.catalog_url,
        path_prefix = %config.urls.path_prefix,
        "starting site pipeline"
    );

    // --- Step 1: Preflight ---
    progress.step_started(Step::Preflight);
    if !config.skip_client {
        let version = runner
            .output(&CommandSpec::new(&config.client.npm).arg("--version"))
            .await?;
        debug!(%version, "npm available");

        let manifest = config.client.dir.join("package.json");
        if !manifest.is_file() {
            return Err(CatalogError::validation(format!(
                "client project not found: {} is missing (are submodules checked out?)",
                manifest.display()
            )));
        }
    }
    if config.publish.is_some() {
        let version = runner.output(&CommandSpec::new("git").arg("--version")).await?;
        debug!(%version, "git available");
    }
    progress.step_finished(Step::Preflight);

    // --- Step 2: Generate ---
    progress.step_started(Step::Generate);
    let generate = generate_catalog(&config.generate)?;
    ensure_non_empty_file(&out_dir.join(CATALOG_FILE))?;
    progress.message(&format!(
        "{} products, {} projects",
        generate.products, generate.projects
    ));
    progress.step_finished(Step::Generate);

    // --- Step 3: Client build ---
    let mut staged_files = 0;
    if config.skip_client {
        info!("client build skipped");
    } else {
        progress.step_started(Step::ClientBuild);
        build_client(&config.client, &config.urls, runner).await?;
        progress.step_finished(Step::ClientBuild);

        // --- Step 4: Stage ---
        progress.step_started(Step::Stage);
        staged_files = copy_dir_contents(&config.client.dist_path(), out_dir)?;
        progress.message(&format!("{staged_files} client files staged"));
    }
    if !dir_is_non_empty(out_dir)? {
        return Err(CatalogError::validation(format!(
            "staging directory {} is empty",
            out_dir.display()
        )));
    }
    if !config.skip_client {
        progress.step_finished(Step::Stage);
    }

    // --- Step 5: Publish ---
    let published = match &config.publish {
        Some(options) => {
            progress.step_started(Step::Publish);
            let published = publish_dir(out_dir, options, runner).await?;
            progress.step_finished(Step::Publish);
            Some(published)
        }
        None => {
            info!("publish disabled");
            None
        }
    };

    let result = SiteResult {
        generate,
        urls: config.urls.clone(),
        staged_files,
        published,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        staged_files = result.staged_files,
        published = result.published.is_some(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "site pipeline complete"
    );

    Ok(result)
}

/// `npm install` then `npm run build -- <url args>` in the client directory.
async fn build_client<R: CommandRunner>(
    client: &ClientBuild,
    urls: &SiteUrls,
    runner: &R,
) -> Result<()> {
    let dist = client.dist_path();
    // Output from an earlier build must not satisfy the check below.
    if dist.exists() {
        std::fs::remove_dir_all(&dist).map_err(|e| CatalogError::io(&dist, e))?;
    }

    runner
        .run(&CommandSpec::new(&client.npm).arg("install").current_dir(&client.dir))
        .await?;
    runner
        .run(
            &CommandSpec::new(&client.npm)
                .args(["run", "build", "--"])
                .args(urls.build_args())
                .current_dir(&client.dir),
        )
        .await?;

    if !dir_is_non_empty(&dist)? {
        return Err(CatalogError::validation(format!(
            "client build produced no output in {}",
            dist.display()
        )));
    }
    Ok(())
}

/// Recursively copy the contents of `src` into `dst`, replacing same-named
/// files. Returns the number of files copied.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<usize> {
    std::fs::create_dir_all(dst).map_err(|e| CatalogError::io(dst, e))?;

    let mut copied = 0;
    for entry in std::fs::read_dir(src).map_err(|e| CatalogError::io(src, e))? {
        let entry = entry.map_err(|e| CatalogError::io(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| CatalogError::io(&from, e))?;

        if file_type.is_dir() {
            copied += copy_dir_contents(&from, &to)?;
        } else if file_type.is_file() {
            std::fs::copy(&from, &to).map_err(|e| CatalogError::io(&to, e))?;
            copied += 1;
        } else {
            warn!(path = %from.display(), "skipping non-regular file");
        }
    }
    Ok(copied)
}

fn ensure_non_empty_file(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|_| CatalogError::validation(format!("{} was not created", path.display())))?;
    if meta.len() == 0 {
        return Err(CatalogError::validation(format!("{} is empty", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::assembler::validate_output;
    use crate::site::SiteTarget;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("osccat-pipeline-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fixture_inputs() -> InputPaths {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/csv");
        InputPaths {
            variables: dir.join("Variables.csv"),
            themes: dir.join("Themes.csv"),
            projects: dir.join("Projects.csv"),
            products: dir.join("Products.csv"),
        }
    }

    /// Records every command; optionally fails one and fakes client output.
    #[derive(Default)]
    struct FakeRunner {
        calls: Mutex<Vec<CommandSpec>>,
        fail_on: Option<&'static str>,
        /// Written into `<cwd>/dist/` when the build command runs.
        dist_file: Option<&'static str>,
    }

    impl FakeRunner {
        fn commands(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|c| c.to_string()).collect()
        }

        fn record(&self, spec: &CommandSpec) -> Result<()> {
            self.calls.lock().unwrap().push(spec.clone());
            let line = spec.to_string();
            if self.fail_on.is_some_and(|f| line.contains(f)) {
                return Err(CatalogError::command_failed(line, "exit status: 1"));
            }
            Ok(())
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<()> {
            self.record(spec)?;
            if spec.args.starts_with(&["run".to_string(), "build".to_string()]) {
                if let (Some(name), Some(cwd)) = (self.dist_file, &spec.cwd) {
                    let dist = cwd.join("dist");
                    std::fs::create_dir_all(dist.join("assets")).unwrap();
                    std::fs::write(dist.join(name), "<html></html>").unwrap();
                    std::fs::write(dist.join("assets/app.js"), "app").unwrap();
                }
            }
            Ok(())
        }

        async fn output(&self, spec: &CommandSpec) -> Result<String> {
            self.record(spec)?;
            if spec.args.first().is_some_and(|a| a == "remote") {
                return Ok("https://github.com/acme/osc.git".into());
            }
            Ok("1.0.0".into())
        }
    }

    struct Fixture {
        root: PathBuf,
        config: SitePipelineConfig,
    }

    impl Fixture {
        fn new(publish: bool) -> Self {
            let root = temp_dir();
            let client_dir = root.join("stac-browser");
            std::fs::create_dir_all(&client_dir).unwrap();
            std::fs::write(client_dir.join("package.json"), "{}").unwrap();

            let target = SiteTarget {
                owner: "Acme".into(),
                repo: "osc".into(),
            };
            let config = SitePipelineConfig {
                generate: GenerateConfig {
                    inputs: fixture_inputs(),
                    out_dir: root.join("dist"),
                    build: BuildOptions::default(),
                    overwrite: false,
                },
                client: ClientBuild {
                    dir: client_dir,
                    npm: "npm".into(),
                    dist_dir: PathBuf::from("dist"),
                },
                urls: SiteUrls::derive(&target).unwrap(),
                skip_client: false,
                publish: publish.then(|| PublishOptions {
                    branch: "gh-pages".into(),
                    remote: None,
                    commit_message: "Publish catalog".into(),
                    author_name: "osccat".into(),
                    author_email: "osccat@example.org".into(),
                    token: None,
                }),
            };
            Self { root, config }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn generate_fixture_catalog() {
        let tmp = temp_dir();
        let config = GenerateConfig {
            inputs: fixture_inputs(),
            out_dir: tmp.join("out"),
            build: BuildOptions::default(),
            overwrite: false,
        };

        let result = generate_catalog(&config).unwrap();
        assert_eq!(result.themes, 3);
        assert_eq!(result.variables, 4);
        assert_eq!(result.products, 5);
        assert_eq!(result.projects, 3);
        assert_eq!(result.catalog_sha256.len(), 64);
        assert_eq!(result.unresolved, Unresolved::default());

        let stats = validate_output(&config.out_dir).unwrap();
        assert_eq!(stats.catalogs, 1);
        assert_eq!(stats.collections, 7);
        assert_eq!(stats.items, 8);

        // A second run needs --overwrite.
        assert!(generate_catalog(&config).is_err());
        let again = GenerateConfig {
            overwrite: true,
            ..config.clone()
        };
        let second = generate_catalog(&again).unwrap();
        assert_eq!(second.catalog_sha256, result.catalog_sha256);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn site_runs_steps_in_order() {
        let fx = Fixture::new(true);
        let runner = FakeRunner {
            dist_file: Some("index.html"),
            ..Default::default()
        };

        let result = run_site(&fx.config, &runner, &SilentProgress).await.unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "npm --version",
                "git --version",
                "npm install",
                "npm run build -- --catalogUrl=https://acme.github.io/osc/catalog.json \
                 --pathPrefix=/osc/",
                "git remote get-url origin",
                "git init --quiet",
                "git checkout --quiet --orphan gh-pages",
                "git add --all",
                "git -c user.name=osccat -c user.email=osccat@example.org commit --quiet \
                 --message Publish catalog",
                "git push --quiet --force https://github.com/acme/osc.git HEAD:refs/heads/gh-pages",
            ]
        );

        let out = &fx.config.generate.out_dir;
        assert_eq!(result.staged_files, 2);
        assert!(out.join("index.html").is_file());
        assert!(out.join("assets/app.js").is_file());
        assert!(out.join(".nojekyll").is_file());
        assert!(out.join(CATALOG_FILE).is_file());
        assert_eq!(result.published.unwrap().branch, "gh-pages");
    }

    #[tokio::test]
    async fn failing_build_stops_before_publish() {
        let fx = Fixture::new(true);
        let runner = FakeRunner {
            fail_on: Some("run build"),
            dist_file: Some("index.html"),
            ..Default::default()
        };

        let err = run_site(&fx.config, &runner, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, CatalogError::CommandFailed { .. }));
        assert!(!runner.commands().iter().any(|c| c.starts_with("git init")));
        assert!(!fx.config.generate.out_dir.join(".nojekyll").exists());
    }

    #[tokio::test]
    async fn empty_client_output_is_an_error() {
        let fx = Fixture::new(true);
        let runner = FakeRunner::default();

        let err = run_site(&fx.config, &runner, &SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("client build produced no output"));
        assert!(!runner.commands().iter().any(|c| c.contains("push")));
    }

    #[tokio::test]
    async fn stale_client_output_is_discarded() {
        let fx = Fixture::new(false);
        let stale = fx.config.client.dist_path();
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.html"), "old").unwrap();

        let runner = FakeRunner::default();
        assert!(run_site(&fx.config, &runner, &SilentProgress).await.is_err());
    }

    #[tokio::test]
    async fn missing_input_stops_before_client_build() {
        let mut fx = Fixture::new(true);
        fx.config.generate.inputs.products = fx.root.join("missing.csv");
        let runner = FakeRunner {
            dist_file: Some("index.html"),
            ..Default::default()
        };

        assert!(run_site(&fx.config, &runner, &SilentProgress).await.is_err());
        assert_eq!(runner.commands(), vec!["npm --version", "git --version"]);
    }

    #[tokio::test]
    async fn missing_client_project_fails_preflight() {
        let fx = Fixture::new(false);
        std::fs::remove_file(fx.config.client.dir.join("package.json")).unwrap();

        let err = run_site(&fx.config, &FakeRunner::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("package.json"));
        assert!(!fx.config.generate.out_dir.exists());
    }

    #[tokio::test]
    async fn skip_client_publishes_catalog_only() {
        let mut fx = Fixture::new(true);
        fx.config.skip_client = true;
        let runner = FakeRunner::default();

        let result = run_site(&fx.config, &runner, &SilentProgress).await.unwrap();
        assert_eq!(result.staged_files, 0);
        let commands = runner.commands();
        assert!(!commands.iter().any(|c| c.starts_with("npm")));
        assert!(commands.iter().any(|c| c.starts_with("git push")));
    }

    #[test]
    fn copy_dir_contents_recurses_and_overwrites() {
        let tmp = temp_dir();
        let src = tmp.join("src");
        let dst = tmp.join("dst");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("index.html"), "new").unwrap();
        std::fs::write(src.join("a/b/c.txt"), "c").unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("index.html"), "old").unwrap();
        std::fs::write(dst.join("keep.txt"), "keep").unwrap();

        assert_eq!(copy_dir_contents(&src, &dst).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(dst.join("index.html")).unwrap(), "new");
        assert!(dst.join("a/b/c.txt").is_file());
        assert!(dst.join("keep.txt").is_file());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn step_labels() {
        assert_eq!(Step::ClientBuild.to_string(), "Building browser client");
        assert_eq!(Step::Publish.to_string(), "Publishing");
    }
}
