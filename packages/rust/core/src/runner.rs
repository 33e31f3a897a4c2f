//! External command execution.
//!
//! The site pipeline drives `npm` and `git` through [`CommandRunner`] so the
//! step ordering can be exercised without either tool installed.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::debug;

use osccat_shared::{CatalogError, Result};

/// Replaces registered secrets when a command is displayed.
const MASK: &str = "***";

/// A program invocation.
///
/// `Display` and `Debug` mask every value registered with
/// [`CommandSpec::secret`], so specs can be logged and put in errors.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Mark `value` as sensitive. Empty values are ignored.
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    fn masked(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), MASK))
    }

    fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", self.masked(arg))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| self.masked(a)).collect();
        let env: Vec<(&str, String)> = self
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), self.masked(v)))
            .collect();
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &args)
            .field("cwd", &self.cwd)
            .field("env", &env)
            .finish()
    }
}

/// Runs external programs.
pub trait CommandRunner: Send + Sync {
    /// Run to completion with inherited stdio. A non-zero exit is an error.
    fn run(&self, spec: &CommandSpec) -> impl Future<Output = Result<()>> + Send;

    /// Run to completion and return trimmed stdout. A non-zero exit is an error.
    fn output(&self, spec: &CommandSpec) -> impl Future<Output = Result<String>> + Send;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        debug!(command = %spec, cwd = ?spec.cwd, "running");

        let status = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| CatalogError::command_failed(&spec.program, format!("spawn: {e}")))?;

        if !status.success() {
            return Err(CatalogError::command_failed(spec.to_string(), status.to_string()));
        }
        Ok(())
    }

    async fn output(&self, spec: &CommandSpec) -> Result<String> {
        debug!(command = %spec, cwd = ?spec.cwd, "capturing output");

        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CatalogError::command_failed(&spec.program, format!("spawn: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CatalogError::command_failed(
                spec.to_string(),
                format!("{}: {}", output.status, spec.masked(stderr.trim())),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
