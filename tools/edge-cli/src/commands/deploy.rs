//! Deploy a checked bundle.
//!
//! The bundle is checked exactly as `wrap` would check it, fingerprinted,
//! and recorded under `.edge/deployments/`. Publishing to the host itself
//! is done by the host's own tooling from that record.

use anyhow::Result;
use chrono::Utc;
use dialoguer::Confirm;
use edge_adapter::BundleManifest;
use serde::{Deserialize, Serialize};

use super::check::{check_manifest, manifest_path, print_summary};
use super::DeployArgs;
use crate::context::Context;

/// Run the deploy command.
pub async fn run(args: DeployArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config.for_environment(&args.env);

    ctx.output.header(&format!("Deploying to {}", args.env));

    // Step 1: Check the build against the adapter
    ctx.output.step(1, 4, "Checking build");
    let manifest_path = manifest_path(args.manifest.as_deref(), &config, ctx)?;
    let spinner = ctx.output.spinner("Checking...");
    let checked = check_manifest(&manifest_path, &config, ctx);
    spinner.finish_and_clear();
    let bundle = checked?;

    // Step 2: Summary
    ctx.output.step(2, 4, "Bundle");
    let app_name = config.app_name(&ctx.project_name());
    ctx.output.kv("Application", &app_name);
    ctx.output.kv("Environment", &args.env);
    print_summary(&bundle, ctx);

    let previous = latest_record(&args.env, ctx)?;
    if let Some(ref previous) = previous {
        if previous.fingerprint == bundle.fingerprint {
            ctx.output
                .info("Bundle is identical to the last deployment to this environment");
        }
    }

    // Step 3: Confirmation
    if !args.yes && !args.dry_run && !ctx.output.is_json() {
        ctx.output.info("");
        let confirmed = Confirm::new()
            .with_prompt("Proceed with deployment?")
            .default(true)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Deployment cancelled");
            return Ok(());
        }
    }

    if args.dry_run {
        ctx.output.step(3, 4, "Dry run - skipping deployment record");
        ctx.output.step(4, 4, "Done (dry run)");
        ctx.output.success("Dry run completed successfully");
        return Ok(());
    }

    // Step 4: Record
    ctx.output.step(3, 4, "Recording deployment");
    let record = DeploymentRecord {
        app_name,
        environment: args.env.clone(),
        timestamp: Utc::now().to_rfc3339(),
        fingerprint: bundle.fingerprint.clone(),
        bundle,
    };
    save_deployment_record(&record, ctx)?;

    ctx.output.step(4, 4, "Done!");
    if ctx.output.is_json() {
        ctx.output.json(&record);
    } else {
        ctx.output.success(&format!(
            "Deployed {} ({})",
            record.app_name,
            record.bundle.short_fingerprint()
        ));
    }

    Ok(())
}

/// What was deployed where, and when.
#[derive(Debug, Serialize, Deserialize)]
struct DeploymentRecord {
    app_name: String,
    environment: String,
    timestamp: String,
    fingerprint: String,
    bundle: BundleManifest,
}

fn record_file_name(record: &DeploymentRecord) -> String {
    format!(
        "{}-{}.json",
        record.environment,
        record.bundle.short_fingerprint()
    )
}

fn save_deployment_record(record: &DeploymentRecord, ctx: &Context) -> Result<()> {
    let path = ctx.deployments_dir()?.join(record_file_name(record));

    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;

    ctx.output.debug(&format!("Saved deployment record: {}", path.display()));

    Ok(())
}

/// Most recent record for `env`, if any.
fn latest_record(env: &str, ctx: &Context) -> Result<Option<DeploymentRecord>> {
    let dir = ctx.project_dir().join(".edge").join("deployments");
    if !dir.exists() {
        return Ok(None);
    }

    let prefix = format!("{}-", env);
    let mut latest: Option<DeploymentRecord> = None;
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".json"));
        if !matches {
            continue;
        }

        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str::<DeploymentRecord>(&content) {
            Ok(record) if record.environment == env => {
                if latest.as_ref().map_or(true, |l| record.timestamp > l.timestamp) {
                    latest = Some(record);
                }
            }
            Ok(_) => {}
            Err(e) => ctx
                .output
                .debug(&format!("Skipping {}: {}", path.display(), e)),
        }
    }

    Ok(latest)
}
