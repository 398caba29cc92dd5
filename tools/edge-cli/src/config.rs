//! CLI configuration.

use std::collections::HashMap;

use anyhow::{Context, Result};
use edge_core::{AdapterConfig, BindingDeclaration, SiteConfig, SiteSection};
use serde::{Deserialize, Serialize};

/// CLI configuration file.
///
/// The `[site]`, `[adapter]` and `[[bindings]]` tables form the
/// [`SiteConfig`]; the rest only matters to the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Site configuration handed to the adapter.
    #[serde(flatten)]
    pub site_config: SiteConfig,

    /// Deployment configuration.
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Parse TOML config text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON config text.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Get environment-specific config.
    pub fn for_environment(&self, env: &str) -> CliConfig {
        let mut config = self.clone();

        if let Some(env_config) = self.environments.get(env) {
            if let Some(ref site) = env_config.site {
                config.site_config.site = site.clone();
            }
            if let Some(ref adapter) = env_config.adapter {
                config.site_config.adapter = adapter.clone();
            }
            if let Some(ref bindings) = env_config.bindings {
                config.site_config.bindings = bindings.clone();
            }
            if let Some(ref deploy) = env_config.deploy {
                config.deploy = deploy.clone();
            }
        }

        config
    }

    /// Application name used in deployment records.
    pub fn app_name(&self, fallback: &str) -> String {
        self.deploy
            .app_name
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Deployment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Application name on the host.
    #[serde(default)]
    pub app_name: Option<String>,

    /// Build manifest used when `--manifest` is not given.
    #[serde(default)]
    pub manifest: Option<String>,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// `[site]` override.
    #[serde(default)]
    pub site: Option<SiteSection>,

    /// `[adapter]` override.
    #[serde(default)]
    pub adapter: Option<AdapterConfig>,

    /// `[[bindings]]` override.
    #[serde(default)]
    pub bindings: Option<Vec<BindingDeclaration>>,

    /// Deploy config override.
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
}

/// Generate a default edge.toml config file.
pub fn generate_default_config(name: &str) -> String {
    format!(
        r#"# Edge site configuration

[site]
# Public URL, used for canonical links.
# url = "https://{name}.example.com"
output = "server"

[adapter]
# cloudflare or spin
kind = "cloudflare"
streaming = true
# text or json
fallback = "text"

# [[bindings]]
# name = "SESSIONS"
# kind = "kv"

[deploy]
app_name = "{name}"
manifest = "dist/build-manifest.json"

[environments.staging.site]
url = "https://staging.{name}.example.com"
output = "server"

[environments.production.adapter]
kind = "cloudflare"
streaming = true
fallback = "json"
"#,
        name = name
    )
}
