//! Site configuration: output mode, adapter selection and declared bindings.

use std::collections::HashSet;
use std::fmt;

use http::Uri;
use serde::{Deserialize, Serialize};

use crate::binding::BindingDeclaration;
use crate::error::ConfigurationError;

/// What the site build emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Pre-rendered assets only. Shims are never invoked.
    Static,
    /// Assets plus render entries executed per request.
    #[default]
    Server,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// Hosting runtime an adapter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Workers-style isolate host: `fetch(request, ctx)`.
    #[default]
    Cloudflare,
    /// Spin component host: `handle(request)`.
    Spin,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloudflare => write!(f, "cloudflare"),
            Self::Spin => write!(f, "spin"),
        }
    }
}

/// Body format of fallback error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackFormat {
    /// `text/plain` reason phrase.
    #[default]
    Text,
    /// `application/problem+json` document.
    Json,
}

/// The `[site]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteSection {
    /// Public URL of the deployed site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Output mode.
    #[serde(default)]
    pub output: OutputMode,
}

/// The `[adapter]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Selected host.
    #[serde(default)]
    pub kind: AdapterKind,
    /// Allow streaming responses where the host supports them.
    #[serde(default = "default_true")]
    pub streaming: bool,
    /// Fallback response format.
    #[serde(default)]
    pub fallback: FallbackFormat,
}

fn default_true() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            kind: AdapterKind::default(),
            streaming: true,
            fallback: FallbackFormat::default(),
        }
    }
}

impl AdapterConfig {
    /// Configuration for a given host with defaults.
    pub fn new(kind: AdapterKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

/// Immutable description of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site metadata and output mode.
    #[serde(default)]
    pub site: SiteSection,
    /// The single active adapter.
    #[serde(default)]
    pub adapter: AdapterConfig,
    /// Bindings the host must provide.
    #[serde(default)]
    pub bindings: Vec<BindingDeclaration>,
}

impl SiteConfig {
    /// Server-rendered site on the given host.
    pub fn server(kind: AdapterKind) -> Self {
        Self {
            site: SiteSection::default(),
            adapter: AdapterConfig::new(kind),
            bindings: Vec::new(),
        }
    }

    /// Set the public site URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.site.url = Some(url.into());
        self
    }

    /// Set the output mode.
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.site.output = output;
        self
    }

    /// Declare a binding.
    pub fn with_binding(mut self, binding: BindingDeclaration) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Output mode.
    pub fn output(&self) -> OutputMode {
        self.site.output
    }

    /// Find a declared binding.
    pub fn binding(&self, name: &str) -> Option<&BindingDeclaration> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(url) = &self.site.url {
            validate_site_url(url)?;
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if binding.name.trim().is_empty() {
                return Err(ConfigurationError::Invalid(
                    "binding name must not be empty".into(),
                ));
            }
            if !seen.insert(binding.name.as_str()) {
                return Err(ConfigurationError::DuplicateBinding(binding.name.clone()));
            }
        }

        Ok(())
    }
}

fn validate_site_url(url: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidSiteUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("URL must be absolute")),
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
