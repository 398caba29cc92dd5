//! Initialize site configuration.

use std::path::Path;

use anyhow::{bail, Result};
use edge_core::{EntryShape, EntrySignature, OutputMode};
use edge_adapter::RoutePlan;

use super::InitArgs;
use crate::config::generate_default_config;
use crate::context::Context;
use crate::plan::BuildManifest;

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let name = args.name.clone().unwrap_or_else(|| {
        ctx.cwd
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-site")
            .to_string()
    });

    ctx.output.header(&format!("Initializing site: {}", name));

    let config_path = ctx.cwd.join("edge.toml");
    if config_path.exists() && !args.force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    ctx.output.step(1, 3, "Creating edge.toml");
    std::fs::write(&config_path, generate_default_config(&name))?;

    ctx.output.step(2, 3, "Creating dist/build-manifest.json");
    write_example_manifest(&ctx.cwd.join("dist"), args.force, ctx)?;

    ctx.output.step(3, 3, "Done!");
    ctx.output.success(&format!("Site '{}' initialized", name));
    ctx.output.info("");
    ctx.output.info("Next steps:");
    ctx.output.list_item("edge shape   # what the adapter accepts");
    ctx.output.list_item("edge check   # validate the build manifest");
    ctx.output.list_item("edge deploy --env staging");

    Ok(())
}

fn write_example_manifest(dist: &Path, force: bool, ctx: &Context) -> Result<()> {
    let path = dist.join("build-manifest.json");
    if path.exists() && !force {
        ctx.output.debug(&format!("Keeping existing {}", path.display()));
        return Ok(());
    }

    std::fs::create_dir_all(dist.join("public"))?;
    let manifest = BuildManifest {
        mode: OutputMode::Server,
        assets_dir: Some("public".into()),
        routes: vec![RoutePlan {
            pattern: "/".to_string(),
            shape: EntryShape::new(EntrySignature::RequestEnvContext).streaming(),
        }],
    };
    std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
    ctx.output.debug(&format!("Created: {}", path.display()));
    Ok(())
}
