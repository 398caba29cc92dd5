//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::config::CliConfig;
use crate::output::Output;

/// Config file names, in lookup order.
pub const CONFIG_NAMES: [&str; 3] = ["edge.toml", ".edge.toml", "edge.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Where the configuration came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (CliConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            match Self::find_config(&cwd) {
                Some(path) => {
                    let config = CliConfig::load(&path.to_string_lossy())?;
                    (config, Some(path))
                }
                None => (CliConfig::default(), None),
            }
        };

        if let Some(ref path) = config_path {
            tracing::debug!(path = %path.display(), "loaded config");
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Directory holding the config file, or the working directory.
    pub fn project_dir(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone())
    }

    /// Get the deployments directory.
    pub fn deployments_dir(&self) -> Result<PathBuf> {
        let deployments = self.project_dir().join(".edge").join("deployments");
        std::fs::create_dir_all(&deployments)?;
        Ok(deployments)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }

    /// Name of the project directory.
    pub fn project_name(&self) -> String {
        self.project_dir()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-site")
            .to_string()
    }
}
