//! Validate a build manifest against the configured adapter.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use edge_adapter::{adapter_for, BundleManifest};

use super::CheckArgs;
use crate::config::CliConfig;
use crate::context::Context;
use crate::output::format_bytes;
use crate::plan::load_plan;

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let config = match args.env.as_deref() {
        Some(env) => ctx.config.for_environment(env),
        None => ctx.config.clone(),
    };
    let manifest_path = manifest_path(args.manifest.as_deref(), &config, ctx)?;

    ctx.output.header("Checking build");
    let bundle = check_manifest(&manifest_path, &config, ctx)?;

    if ctx.output.is_json() {
        ctx.output.json(&bundle);
        return Ok(());
    }

    print_summary(&bundle, ctx);
    ctx.output.success("Build matches the negotiated output shape");
    Ok(())
}

/// Resolve the manifest from the flag or the config.
pub fn manifest_path(flag: Option<&str>, config: &CliConfig, ctx: &Context) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(ctx.resolve_path(path)),
        None => config
            .deploy
            .manifest
            .as_deref()
            .map(|path| ctx.project_dir().join(path))
            .context("No build manifest given. Pass --manifest or set deploy.manifest."),
    }
}

/// Plan the manifest and run the adapter's deploy checks on it.
pub fn check_manifest(
    path: &std::path::Path,
    config: &CliConfig,
    ctx: &Context,
) -> Result<BundleManifest> {
    ctx.output.debug(&format!("Reading {}", path.display()));
    let plan = load_plan(path)?;

    let adapter = adapter_for(config.site_config.clone());
    tracing::debug!(
        host = %adapter.kind(),
        routes = plan.routes.len(),
        assets = plan.assets.len(),
        "checking build plan"
    );
    let bundle = adapter
        .check(&plan)
        .with_context(|| format!("{} rejected {}", adapter.kind(), path.display()))?;
    Ok(bundle)
}

/// Print what a bundle contains.
pub fn print_summary(bundle: &BundleManifest, ctx: &Context) {
    ctx.output.kv("Host", &bundle.host.to_string());
    ctx.output.kv("Module format", &bundle.module_format);
    ctx.output.kv("Output", &bundle.output.to_string());
    ctx.output.kv("Streaming", &bundle.streaming.to_string());
    if let Some(ref site) = bundle.site {
        ctx.output.kv("Site", site);
    }

    let total: usize = bundle.assets.iter().map(|a| a.size).sum();
    ctx.output.kv(
        "Assets",
        &format!("{} ({})", bundle.assets.len(), format_bytes(total as u64)),
    );
    ctx.output.kv("Routes", &bundle.routes.len().to_string());
    for route in &bundle.routes {
        ctx.output
            .list_item(&format!("{} {}", route.pattern, route.shape.signature));
    }
    ctx.output.kv("Fingerprint", bundle.short_fingerprint());
}
