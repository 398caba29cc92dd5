//! Build manifests written by site builds.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use edge_adapter::{AssetPlan, BuildPlan, RoutePlan, StaticAsset};
use edge_core::OutputMode;
use serde::{Deserialize, Serialize};

/// On-disk description of a build.
///
/// ```json
/// {
///   "mode": "server",
///   "assets_dir": "public",
///   "routes": [
///     { "pattern": "/", "signature": "request-env-context", "response": "streaming" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    #[serde(default)]
    pub mode: OutputMode,

    /// Directory whose files become static assets, relative to the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,

    #[serde(default)]
    pub routes: Vec<RoutePlan>,
}

impl BuildManifest {
    /// Read a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build manifest: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build manifest: {}", path.display()))
    }

    /// Digest assets and produce the plan the adapter checks.
    ///
    /// `base` is the directory the manifest lives in.
    pub fn into_plan(self, base: &Path) -> Result<BuildPlan> {
        let mut assets = Vec::new();
        if let Some(dir) = &self.assets_dir {
            let root = base.join(dir);
            collect_assets(&root, &root, &mut assets)
                .with_context(|| format!("Failed to read assets from {}", root.display()))?;
        }
        assets.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(BuildPlan {
            mode: self.mode,
            assets: assets.iter().map(AssetPlan::from_asset).collect(),
            routes: self.routes,
        })
    }
}

/// Load the manifest at `path` and plan it.
pub fn load_plan(path: &Path) -> Result<BuildPlan> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    BuildManifest::load(path)?.into_plan(base)
}

fn collect_assets(root: &Path, dir: &Path, out: &mut Vec<StaticAsset>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_assets(root, &path, out)?;
            continue;
        }

        let relative = path.strip_prefix(root)?;
        let url_path: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let bytes = std::fs::read(&path)?;
        out.push(StaticAsset::new(format!("/{}", url_path.join("/")), bytes));
    }
    Ok(())
}
