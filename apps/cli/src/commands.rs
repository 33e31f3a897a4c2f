//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use osccat_core::assembler::validate_output;
use osccat_core::builder::BuildOptions;
use osccat_core::pipeline::{
    ClientBuild, GenerateConfig, GenerateResult, ProgressReporter, SiteResult, SitePipelineConfig,
    Step, generate_catalog, run_site,
};
use osccat_core::publish::PublishOptions;
use osccat_core::runner::ProcessRunner;
use osccat_core::site::{SiteTarget, SiteUrls};
use osccat_shared::{AppConfig, CONFIG_FILE_NAME, init_config, load_config};
use osccat_sources::InputPaths;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// osccat: build and publish the Open Science Catalog.
#[derive(Parser)]
#[command(
    name = "osccat",
    version,
    about = "Generate a STAC catalog from the OSC spreadsheets and publish it with a browser client.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./osccat.toml, then ~/.osccat/osccat.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate the catalog from the four CSV tables.
    Generate {
        /// Variables table (defaults to [inputs].variables).
        variables: Option<PathBuf>,

        /// Themes table (defaults to [inputs].themes).
        themes: Option<PathBuf>,

        /// Projects table (defaults to [inputs].projects).
        projects: Option<PathBuf>,

        /// Products table (defaults to [inputs].products).
        products: Option<PathBuf>,

        /// Output directory (defaults to [catalog].out_dir).
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Replace a previously generated catalog.
        #[arg(long)]
        overwrite: bool,

        /// Fail on references to unknown themes or variables.
        #[arg(long)]
        strict: bool,
    },

    /// Generate the catalog, build the browser client, and publish the site.
    Site {
        /// Repository owner (defaults to [site].owner, then GITHUB_REPOSITORY_OWNER).
        #[arg(long)]
        owner: Option<String>,

        /// Repository name (defaults to [site].repo, then GITHUB_REPOSITORY).
        #[arg(long)]
        repo: Option<String>,

        /// Output directory (defaults to [catalog].out_dir).
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Replace a previously generated catalog.
        #[arg(long)]
        overwrite: bool,

        /// Publish the catalog without building the browser client.
        #[arg(long)]
        skip_client: bool,

        /// Push the result to the hosting branch.
        #[arg(long)]
        publish: bool,

        /// Remote to push to (defaults to [publish].remote, then origin).
        #[arg(long)]
        remote: Option<String>,

        /// Token for HTTPS remotes.
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Print the catalog URL and path prefix the client is built with.
    Urls {
        /// Repository owner.
        #[arg(long)]
        owner: Option<String>,

        /// Repository name.
        #[arg(long)]
        repo: Option<String>,
    },

    /// Check that every link in a generated catalog resolves.
    Validate {
        /// Catalog directory (defaults to [catalog].out_dir).
        dir: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults (to --config, or ./osccat.toml).
    Init,

    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "osccat=info",
        1 => "osccat=debug",
        _ => "osccat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Generate {
            variables,
            themes,
            projects,
            products,
            out_dir,
            overwrite,
            strict,
        } => {
            let config = load_config(config_path)?;
            let mut inputs = InputPaths::from(&config.inputs);
            for (slot, arg) in [
                (&mut inputs.variables, variables),
                (&mut inputs.themes, themes),
                (&mut inputs.projects, projects),
                (&mut inputs.products, products),
            ] {
                if let Some(path) = arg {
                    *slot = path;
                }
            }
            cmd_generate(&config, inputs, out_dir, overwrite, strict)
        }
        Command::Site {
            owner,
            repo,
            out_dir,
            overwrite,
            skip_client,
            publish,
            remote,
            token,
        } => {
            let config = load_config(config_path)?;
            let target = SiteTarget::resolve(owner.as_deref(), repo.as_deref(), &config.site)?;
            let publish = (publish || config.publish.enabled).then(|| PublishOptions {
                remote: remote.or_else(|| config.publish.remote.clone()),
                token,
                ..PublishOptions::from(&config.publish)
            });
            let site = SiteArgs {
                target,
                out_dir,
                overwrite,
                skip_client,
                publish,
            };
            cmd_site(&config, site).await
        }
        Command::Urls { owner, repo } => {
            let config = load_config(config_path)?;
            cmd_urls(&config, owner.as_deref(), repo.as_deref())
        }
        Command::Validate { dir } => {
            let config = load_config(config_path)?;
            let dir = dir.unwrap_or_else(|| PathBuf::from(&config.catalog.out_dir));
            cmd_validate(&dir)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn build_options(config: &AppConfig, strict: bool) -> BuildOptions {
    let mut options = BuildOptions::from(&config.catalog);
    options.strict |= strict;
    options
}

fn cmd_generate(
    config: &AppConfig,
    inputs: InputPaths,
    out_dir: Option<PathBuf>,
    overwrite: bool,
    strict: bool,
) -> Result<()> {
    let generate = GenerateConfig {
        inputs,
        out_dir: out_dir.unwrap_or_else(|| PathBuf::from(&config.catalog.out_dir)),
        build: build_options(config, strict),
        overwrite,
    };

    let result = generate_catalog(&generate)?;
    print_generate_summary(&result);
    Ok(())
}

/// Resolved arguments of `osccat site`.
struct SiteArgs {
    target: SiteTarget,
    out_dir: Option<PathBuf>,
    overwrite: bool,
    skip_client: bool,
    publish: Option<PublishOptions>,
}

async fn cmd_site(config: &AppConfig, args: SiteArgs) -> Result<()> {
    let urls = SiteUrls::derive(&args.target)?;
    info!(repository = %args.target, catalog_url = %urls.catalog_url, "resolved site");

    let pipeline = SitePipelineConfig {
        generate: GenerateConfig {
            inputs: InputPaths::from(&config.inputs),
            out_dir: args
                .out_dir
                .unwrap_or_else(|| PathBuf::from(&config.catalog.out_dir)),
            build: build_options(config, false),
            overwrite: args.overwrite,
        },
        client: ClientBuild::from(&config.client),
        urls,
        skip_client: args.skip_client,
        publish: args.publish,
    };

    let reporter = CliProgress::new();
    let result = run_site(&pipeline, &ProcessRunner, &reporter)
        .await
        .inspect_err(|_| reporter.spinner.finish_and_clear())?;

    print_generate_summary(&result.generate);
    println!("  Catalog URL: {}", result.urls.catalog_url);
    println!("  Prefix:      {}", result.urls.path_prefix);
    println!("  Staged:      {} client files", result.staged_files);
    match &result.published {
        Some(published) => println!(
            "  Published:   {} ({})",
            published.branch, published.remote
        ),
        None => println!("  Published:   no (pass --publish)"),
    }
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_urls(config: &AppConfig, owner: Option<&str>, repo: Option<&str>) -> Result<()> {
    let target = SiteTarget::resolve(owner, repo, &config.site)?;
    let urls = SiteUrls::derive(&target)?;

    println!("catalogUrl: {}", urls.catalog_url);
    println!("pathPrefix: {}", urls.path_prefix);
    Ok(())
}

fn cmd_validate(dir: &Path) -> Result<()> {
    let stats = validate_output(dir)
        .wrap_err_with(|| format!("{} is not a valid catalog", dir.display()))?;

    println!(
        "{}: {} catalog, {} collections, {} items, all links resolve",
        dir.display(),
        stats.catalogs,
        stats.collections,
        stats.items
    );
    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);
    init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(path)?;
    let toml_str = toml::to_string_pretty(&config).map_err(|e| eyre!("serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

fn print_generate_summary(result: &GenerateResult) {
    println!();
    println!("  Catalog generated!");
    println!("  Path:      {}", result.out_dir.display());
    println!("  Themes:    {}", result.themes);
    println!("  Variables: {}", result.variables);
    println!("  Products:  {}", result.products);
    println!("  Projects:  {}", result.projects);
    println!("  Documents: {}", result.documents.len());
    println!("  SHA-256:   {}", result.catalog_sha256);

    let unresolved = &result.unresolved;
    let skipped = unresolved.variables + unresolved.products + unresolved.project_themes;
    if skipped > 0 {
        println!(
            "  Skipped:   {} variables, {} products, {} project themes (unknown references)",
            unresolved.variables, unresolved.products, unresolved.project_themes
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// Progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn step_started(&self, step: Step) {
        self.spinner.set_message(format!("{step}..."));
    }

    fn step_finished(&self, step: Step) {
        self.spinner.println(format!("  done: {step}"));
    }

    fn message(&self, msg: &str) {
        self.spinner.set_message(msg.to_string());
    }

    fn done(&self, _result: &SiteResult) {
        self.spinner.finish_and_clear();
    }
}
