//! Serializable build plans and bundle manifests.
//!
//! A [`BuildPlan`] is the shape-only view of a [`BuildOutput`]: asset digests
//! and entry shapes without the entries themselves. All deploy-time checks
//! run against the plan, so a build tool can validate a build it only has on
//! disk.

use std::collections::HashSet;

use edge_core::{
    AdapterKind, BindingDeclaration, ConfigurationError, EntryShape, OutputMode, SiteConfig,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::build::{BuildOutput, StaticAsset};
use crate::route::RoutePattern;
use crate::shape::OutputShapeSpec;

/// Compute SHA-256 of bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of one static asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPlan {
    pub path: String,
    pub content_type: String,
    pub size: usize,
    pub sha256: String,
}

impl AssetPlan {
    /// Digest an asset.
    pub fn from_asset(asset: &StaticAsset) -> Self {
        Self {
            path: asset.path.clone(),
            content_type: asset.content_type.clone(),
            size: asset.bytes.len(),
            sha256: sha256_hex(&asset.bytes),
        }
    }
}

/// Route pattern and the shape of the entry behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub pattern: String,
    #[serde(flatten)]
    pub shape: EntryShape,
}

/// Everything the deploy checks need to know about a build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default)]
    pub assets: Vec<AssetPlan>,
    #[serde(default)]
    pub routes: Vec<RoutePlan>,
}

impl BuildPlan {
    /// Plan for an in-memory build.
    pub fn from_build(build: &BuildOutput) -> Self {
        Self {
            mode: build.mode,
            assets: build.assets.iter().map(AssetPlan::from_asset).collect(),
            routes: build
                .entries
                .iter()
                .map(|e| RoutePlan {
                    pattern: e.pattern.clone(),
                    shape: e.entry.shape(),
                })
                .collect(),
        }
    }
}

/// Validate a plan against a host's output shape and the site configuration.
///
/// Returns the parsed route patterns in plan order.
pub fn check_plan(
    spec: &OutputShapeSpec,
    config: &SiteConfig,
    plan: &BuildPlan,
) -> Result<Vec<RoutePattern>, ConfigurationError> {
    config.validate()?;

    for decl in &config.bindings {
        if !spec.supports_binding(decl.kind) {
            return Err(ConfigurationError::UnsupportedBinding {
                host: spec.host.to_string(),
                name: decl.name.clone(),
                kind: decl.kind,
            });
        }
    }

    if plan.mode != config.output() {
        return Err(ConfigurationError::Invalid(format!(
            "build ran in {} mode but the site is configured for {} output",
            plan.mode,
            config.output()
        )));
    }
    spec.check_output(plan.mode)?;

    if plan.mode == OutputMode::Static && !plan.routes.is_empty() {
        return Err(ConfigurationError::EntriesInStaticBuild {
            count: plan.routes.len(),
        });
    }

    let mut paths = HashSet::new();
    for asset in &plan.assets {
        if !asset.path.starts_with('/') {
            return Err(ConfigurationError::Invalid(format!(
                "asset path '{}' must start with '/'",
                asset.path
            )));
        }
        if !paths.insert(asset.path.as_str()) {
            return Err(ConfigurationError::DuplicateAsset(asset.path.clone()));
        }
    }

    let mut patterns = Vec::with_capacity(plan.routes.len());
    let mut keys = HashSet::new();
    for route in &plan.routes {
        let pattern = RoutePattern::parse(&route.pattern)?;
        if !keys.insert(pattern.key()) {
            return Err(ConfigurationError::DuplicateRoute(route.pattern.clone()));
        }

        spec.check_entry(&route.pattern, &route.shape)?;

        for name in &route.shape.bindings {
            if config.binding(name).is_none() {
                return Err(ConfigurationError::UndeclaredBinding {
                    route: route.pattern.clone(),
                    binding: name.clone(),
                });
            }
        }
        patterns.push(pattern);
    }

    Ok(patterns)
}

/// Deploy-time description of a bundle with a stable content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub host: AdapterKind,
    pub module_format: String,
    pub output: OutputMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// Whether streaming bodies reach the client unbuffered.
    pub streaming: bool,
    pub routes: Vec<RoutePlan>,
    pub assets: Vec<AssetPlan>,
    pub bindings: Vec<BindingDeclaration>,
    /// SHA-256 over every other field.
    pub fingerprint: String,
}

impl BundleManifest {
    /// Build the manifest for a checked plan.
    pub fn new(spec: &OutputShapeSpec, config: &SiteConfig, plan: &BuildPlan, streaming: bool) -> Self {
        let mut manifest = Self {
            host: spec.host,
            module_format: spec.module_format.clone(),
            output: plan.mode,
            site: config.site.url.clone(),
            streaming,
            routes: plan.routes.clone(),
            assets: plan.assets.clone(),
            bindings: config.bindings.clone(),
            fingerprint: String::new(),
        };
        manifest.fingerprint = manifest.compute_fingerprint();
        manifest
    }

    /// Fingerprint of the manifest contents, ignoring the stored fingerprint.
    pub fn compute_fingerprint(&self) -> String {
        let unsigned = Self {
            fingerprint: String::new(),
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unsigned).unwrap_or_default();
        sha256_hex(&bytes)
    }

    /// Whether the stored fingerprint matches the contents.
    pub fn verify(&self) -> bool {
        self.fingerprint == self.compute_fingerprint()
    }

    /// Short fingerprint for display.
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..self.fingerprint.len().min(12)]
    }
}
